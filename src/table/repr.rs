//! Cell formats shared by the slice and segment tables.
//!
//! Lists are written the way Python prints them (`['C4', 'E4']`,
//! `[0, 4, 7]`) and sets as `{'M2', 'm3'}` or `set()`, so tables stay
//! readable next to the YCAC-style files they are modelled on.

fn strip_quotes(item: &str) -> &str {
    let item = item.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = item.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    item
}

fn split_items(inner: &str) -> Vec<String> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|item| strip_quotes(item).to_string())
        .collect()
}

pub fn format_str_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{}'", item)).collect();
    format!("[{}]", quoted.join(", "))
}

pub fn parse_str_list(cell: &str) -> Result<Vec<String>, String> {
    let inner = cell
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("expected a bracketed list, got {:?}", cell))?;
    Ok(split_items(inner))
}

pub fn format_int_list(items: &[u8]) -> String {
    let items: Vec<String> = items.iter().map(|n| n.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Parses `[0, 4, 7]`; the brackets are optional so `0,4,7` also works.
pub fn parse_int_list(cell: &str) -> Result<Vec<u8>, String> {
    let trimmed = cell.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    split_items(inner)
        .iter()
        .map(|item| {
            item.parse::<u8>()
                .map_err(|_| format!("invalid integer {:?} in {:?}", item, cell))
        })
        .collect()
}

pub fn format_set<I>(items: I, quoted: bool) -> String
where
    I: IntoIterator,
    I::Item: std::fmt::Display,
{
    let items: Vec<String> = items
        .into_iter()
        .map(|item| if quoted { format!("'{}'", item) } else { item.to_string() })
        .collect();
    if items.is_empty() {
        "set()".to_string()
    } else {
        format!("{{{}}}", items.join(", "))
    }
}

pub fn parse_set(cell: &str) -> Result<Vec<String>, String> {
    let trimmed = cell.trim();
    if trimmed == "set()" || trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| format!("expected a set, got {:?}", cell))?;
    Ok(split_items(inner))
}

/// Reads a number written either as a decimal or as a fraction `n/d`.
/// Fractions are rounded to two decimal places.
pub fn parse_number(cell: &str) -> Result<f64, String> {
    let cell = cell.trim();
    if let Some((num, den)) = cell.split_once('/') {
        let num: i64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid fraction {:?}", cell))?;
        let den: i64 = den
            .trim()
            .parse()
            .map_err(|_| format!("invalid fraction {:?}", cell))?;
        if den == 0 {
            return Err(format!("zero denominator in {:?}", cell));
        }
        return Ok((num as f64 / den as f64 * 100.0).round() / 100.0);
    }
    cell.parse::<f64>()
        .map_err(|_| format!("invalid number {:?}", cell))
}

/// Float formatting that always keeps a decimal point (`1.0`, `0.25`).
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists() {
        let pitches = vec!["C4".to_string(), "E-4".to_string()];
        assert_eq!(format_str_list(&pitches), "['C4', 'E-4']");
        assert_eq!(parse_str_list("['C4', 'E-4']").unwrap(), pitches);
        assert!(parse_str_list("[]").unwrap().is_empty());
        assert_eq!(parse_int_list("[0, 3, 7]").unwrap(), vec![0, 3, 7]);
        assert_eq!(parse_int_list("0,4,8").unwrap(), vec![0, 4, 8]);
    }

    #[test]
    fn sets() {
        assert_eq!(format_set(["M2", "m3"], true), "{'M2', 'm3'}");
        assert_eq!(format_set(Vec::<String>::new(), true), "set()");
        assert_eq!(parse_set("{'M2', 'm3'}").unwrap(), vec!["M2", "m3"]);
        assert!(parse_set("set()").unwrap().is_empty());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("7/3").unwrap(), 2.33);
        assert_eq!(parse_number("1.5").unwrap(), 1.5);
        assert!(parse_number("one").is_err());
        assert_eq!(format_float(1.0), "1.0");
    }
}
