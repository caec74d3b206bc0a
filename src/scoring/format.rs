//! Display helpers shared by the tables

/// "$1,234" / "-$1,234", whole dollars
pub fn format_earnings(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Score to par: "+3", "E", "-4", or "--" when unknown
pub fn format_score(score: Option<i32>) -> String {
    match score {
        None => "--".to_string(),
        Some(0) => "E".to_string(),
        Some(s) if s > 0 => format!("+{}", s),
        Some(s) => s.to_string(),
    }
}

/// Movement between two ranks: "▲2", "▼1", or "--"
pub fn format_rank_delta(delta: i64) -> String {
    if delta > 0 {
        format!("▲{}", delta)
    } else if delta < 0 {
        format!("▼{}", -delta)
    } else {
        "--".to_string()
    }
}

/// Descending ranks with ties sharing the average rank, truncated.
///
/// Two teams tied at the top both get 1 (1.5 truncated); three tied for
/// 2nd all get 3.
pub fn average_ranks(values: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0u32; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }

        // 1-based places start+1 ..= end+1
        let average = ((start + 1) + (end + 1)) as f64 / 2.0;
        for &idx in &order[start..=end] {
            ranks[idx] = average as u32;
        }
        start = end + 1;
    }
    ranks
}
