//! Plain-text number formatting shared by the spin files and the raw dataset.
//!
//! Floats follow the `%.18e` layout (`-1.250000000000000000e+00`) so the files
//! stay readable by `numpy.loadtxt` and friends.

/// Format a float as `%.18e`.
pub fn fmt_float(x: f64) -> String {
    if !x.is_finite() {
        return format!("{}", x);
    }
    let s = format!("{:.18e}", x);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}

/// Space separated row of `%.18e` values.
pub fn fmt_row<I: IntoIterator<Item = f64>>(values: I) -> String {
    values
        .into_iter()
        .map(fmt_float)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse every whitespace-separated token of `content` as a float, skipping
/// `#` comments.
pub fn parse_floats(content: &str) -> Result<Vec<f64>, String> {
    let mut values = Vec::new();
    for line in content.lines() {
        let data = line.split('#').next().unwrap_or("");
        for token in data.split_whitespace() {
            values.push(token.parse::<f64>().map_err(|_| token.to_string())?);
        }
    }
    Ok(values)
}
