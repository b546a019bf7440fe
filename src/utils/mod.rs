use std::collections::HashSet;

use crate::loader::RecordId;

pub fn parse_id_list(value: &str) -> Result<Vec<RecordId>, String> {
    let mut out: Vec<RecordId> = Vec::new();
    let mut seen: HashSet<RecordId> = HashSet::new();
    for item in value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        let id: RecordId = item
            .parse()
            .map_err(|_| format!("invalid record id '{item}'"))?;
        if seen.insert(id) {
            out.push(id);
        }
    }
    if out.is_empty() {
        return Err("id list is empty".to_string());
    }
    Ok(out)
}

pub fn parse_fields_csv(value: &str) -> Result<Vec<String>, String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for item in value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !item
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(format!("invalid field name '{item}'"));
        }
        if seen.insert(item.to_string()) {
            out.push(item.to_string());
        }
    }
    if out.is_empty() {
        return Err("fields list is empty".to_string());
    }
    if !seen.contains("id") {
        out.insert(0, "id".to_string());
    }
    Ok(out)
}

pub fn parse_page_number(value: &str) -> Result<u32, String> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err("pages start at 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid page number '{}'", value.trim())),
    }
}
