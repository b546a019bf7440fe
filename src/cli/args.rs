use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "artable",
    version,
    about = "browse the art catalog page by page and select records across pages",
    long_about = "Artable loads the public artwork catalog one page at a time and keeps a selection that survives paging.\n\nExamples:\n  artable\n  artable --page 3 --bulk 15\n  artable --script session.txt -o json\n  artable --config ~/.artable/config.yml\n\nType 'help' at the prompt for the list of table commands."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Table rendering format: text or json."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.artable/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a commented default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 's',
        long = "scr",
        visible_alias = "script",
        value_name = "FILE",
        help_heading = "Input",
        help = "Read table commands from a file instead of stdin."
    )]
    pub script: Option<String>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "N",
        help_heading = "Table",
        help = "Page to open first (1-indexed)."
    )]
    pub page: Option<u32>,

    #[arg(
        short = 'b',
        long = "bk",
        visible_alias = "bulk",
        value_name = "N",
        help_heading = "Table",
        help = "Select the first N records before the first page is shown."
    )]
    pub bulk: Option<usize>,

    #[arg(
        short = 'a',
        long = "api",
        visible_alias = "api-url",
        value_name = "URL",
        help_heading = "Catalog",
        help = "Catalog API base URL."
    )]
    pub api_url: Option<String>,

    #[arg(
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Catalog",
        help = "Records per page requested from the catalog."
    )]
    pub page_size: Option<u32>,

    #[arg(
        long = "fld",
        visible_alias = "fields",
        value_name = "FIELDS",
        help_heading = "Catalog",
        help = "Comma-separated catalog fields to request."
    )]
    pub fields: Option<String>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "HTTP",
        help = "Request rate limit (requests per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy for catalog requests."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "ua",
        visible_alias = "user-agent",
        value_name = "AGENT",
        help_heading = "HTTP",
        help = "User agent sent to the catalog."
    )]
    pub user_agent: Option<String>,
}
