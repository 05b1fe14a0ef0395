//! `None` is the not-a-number sentinel: it means "could not parse" and every
//! consumer excludes it from rankings and averages instead of reading it as 0.

pub fn to_number(cell: Option<&str>) -> Option<f64> {
    let trimmed = cell?.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if trimmed.is_empty() {
        return None;
    }

    let compact = trimmed
        .chars()
        .filter(|character| !matches!(character, ' ' | '\u{00A0}' | '\u{202F}'))
        .collect::<String>();

    let canonical = canonical_decimal(&compact)?;
    canonical
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn canonical_decimal(text: &str) -> Option<String> {
    let dots = text.matches('.').count();
    let commas = text.matches(',').count();

    let canonical = match (dots, commas) {
        (_, 0) if dots <= 1 => text.to_string(),
        (_, 0) => text.replace('.', ""),
        (0, 1) => text.replace(',', "."),
        (0, _) => text.replace(',', ""),
        _ => {
            let last_dot = text.rfind('.')?;
            let last_comma = text.rfind(',')?;
            if last_comma > last_dot {
                if commas > 1 {
                    return None;
                }
                text.replace('.', "").replace(',', ".")
            } else {
                if dots > 1 {
                    return None;
                }
                text.replace(',', "")
            }
        }
    };

    Some(canonical)
}

pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0usize), |(sum, count), value| {
            (sum + value, count + 1)
        });

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_empty_and_garbage_are_sentinel() {
        for cell in [
            None,
            Some(""),
            Some("   "),
            Some("%"),
            Some("N/A"),
            Some("-"),
            Some("abc"),
            Some("12abc"),
            Some("NaN"),
            Some("inf"),
            Some("1.2.3,4,5"),
        ] {
            assert_eq!(to_number(cell), None, "cell {cell:?}");
        }
    }

    #[test]
    fn percent_suffix_is_stripped() {
        assert_eq!(to_number(Some("56.3%")), Some(56.3));
        assert_eq!(to_number(Some(" 48 % ")), Some(48.0));
        assert_eq!(to_number(Some("-2.5%")), Some(-2.5));
    }

    #[test]
    fn plain_numbers_parse() {
        assert_eq!(to_number(Some("1.30")), Some(1.30));
        assert_eq!(to_number(Some("512")), Some(512.0));
        assert_eq!(to_number(Some("+0.5")), Some(0.5));
    }

    #[test]
    fn locale_separators_are_understood() {
        assert_eq!(to_number(Some("56,3")), Some(56.3));
        assert_eq!(to_number(Some("56,3%")), Some(56.3));
        assert_eq!(to_number(Some("1.234,5")), Some(1234.5));
        assert_eq!(to_number(Some("1,234.5")), Some(1234.5));
        assert_eq!(to_number(Some("1.234.567")), Some(1_234_567.0));
        assert_eq!(to_number(Some("1,234,567")), Some(1_234_567.0));
        assert_eq!(to_number(Some("1 234,5")), Some(1234.5));
    }

    #[test]
    fn mean_skips_sentinels() {
        assert_eq!(mean([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean([None, None]), None);
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
    }
}
