use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if args.page == Some(0) {
        return Err("invalid page, pages start at 1".to_string());
    }
    if args.page_size == Some(0) {
        return Err("invalid page-size, expected positive integer".to_string());
    }
    if args.rate == Some(0) {
        return Err("invalid rate, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    if let Some(raw) = args.fields.as_deref() {
        crate::utils::parse_fields_csv(raw).map_err(|e| format!("invalid --fields '{raw}': {e}"))?;
    }
    if let Some(raw) = args.api_url.as_deref() {
        reqwest::Url::parse(raw.trim()).map_err(|e| format!("invalid --api-url '{raw}': {e}"))?;
    }
    Ok(())
}
