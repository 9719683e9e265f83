//! Per-field interpolation of chart records

use cna_metrics::{ChartRecord, FieldValue, Series};

/// Interpolate one record toward `target`
///
/// The output carries the target's fields in the target's order. A numeric
/// target field with a numeric start field is blended; any other field takes
/// the target value.
#[must_use]
pub fn interpolate_record(start: &ChartRecord, target: &ChartRecord, eased: f64) -> ChartRecord {
    target
        .iter()
        .map(|(key, to)| {
            let value = match (start.get(key), to) {
                (Some(FieldValue::Number(from)), FieldValue::Number(to)) => {
                    FieldValue::Number(from + (to - from) * eased)
                }
                _ => to.clone(),
            };
            (key.to_string(), value)
        })
        .collect()
}

/// Interpolate a whole series toward `target`
///
/// Series of different lengths cannot be blended element-wise; the target is
/// returned as-is.
#[must_use]
pub fn interpolate_series(start: &Series, target: &Series, eased: f64) -> Series {
    if start.len() != target.len() {
        return target.clone();
    }
    start
        .iter()
        .zip(target)
        .map(|(from, to)| interpolate_record(from, to, eased))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(name: &str, value: f64) -> ChartRecord {
        ChartRecord::new().with_text("name", name).with_number("value", value)
    }

    #[test]
    fn numeric_fields_blend() {
        let out = interpolate_record(&row("a", 10.0), &row("b", 20.0), 0.25);
        assert_eq!(out.number("value"), Some(12.5));
        // labels are replaced, never blended
        assert_eq!(out.text("name"), Some("b"));
    }

    #[test]
    fn missing_or_textual_start_snaps() {
        let start = ChartRecord::new().with_text("value", "n/a");
        let out = interpolate_record(&start, &row("b", 20.0), 0.1);
        assert_eq!(out.number("value"), Some(20.0));

        let out = interpolate_record(&ChartRecord::new(), &row("b", 20.0), 0.1);
        assert_eq!(out.number("value"), Some(20.0));
    }

    #[test]
    fn output_uses_target_fields_only() {
        let start = row("a", 1.0).with_number("stale", 3.0);
        let out = interpolate_record(&start, &row("b", 2.0), 0.5);
        assert_eq!(out.get("stale"), None);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn length_mismatch_returns_target() {
        let start = vec![row("a", 1.0)];
        let target = vec![row("a", 5.0), row("b", 7.0)];
        assert_eq!(interpolate_series(&start, &target, 0.5), target);
    }

    #[test]
    fn eased_zero_reproduces_start() {
        let start = vec![row("a", 0.1), row("b", 0.7)];
        let target = vec![row("a", 0.3), row("b", 0.2)];
        assert_eq!(interpolate_series(&start, &target, 0.0), start);
    }
}
