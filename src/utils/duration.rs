use chrono::Duration;

const MAX_MINUTES: i64 = 24 * 60;

/// Parses a test duration such as `"90"`, `"45m"`, `"1h 30m"`, `"2 hours"` or
/// `"1:15"` into whole minutes. A bare number is minutes.
pub fn parse_duration_minutes(raw: &str) -> Result<i64, String> {
    let input = raw.trim().to_ascii_lowercase();
    if input.is_empty() {
        return Err("Duration is empty".to_string());
    }

    let minutes = if let Some((h, m)) = input.split_once(':') {
        let hours: i64 = h.trim().parse().map_err(|_| invalid(raw))?;
        let mins: i64 = m.trim().parse().map_err(|_| invalid(raw))?;
        if hours < 0 || !(0..60).contains(&mins) {
            return Err(invalid(raw));
        }
        hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(mins))
            .ok_or_else(|| invalid(raw))?
    } else if let Ok(n) = input.parse::<i64>() {
        n
    } else {
        parse_units(&input).ok_or_else(|| invalid(raw))?
    };

    if minutes <= 0 {
        return Err("Duration must be at least one minute".to_string());
    }
    if minutes > MAX_MINUTES {
        return Err("Duration cannot exceed 24 hours".to_string());
    }
    Ok(minutes)
}

pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    parse_duration_minutes(raw).map(Duration::minutes)
}

fn parse_units(input: &str) -> Option<i64> {
    let mut total = 0i64;
    let mut number = String::new();
    let mut unit = String::new();
    let mut seen_any = false;

    let mut flush = |number: &mut String, unit: &mut String| -> Option<()> {
        if number.is_empty() {
            return if unit.is_empty() { Some(()) } else { None };
        }
        let n: i64 = number.parse().ok()?;
        let factor = match unit.as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" => 60,
            "m" | "min" | "mins" | "minute" | "minutes" | "" => 1,
            _ => return None,
        };
        total = n.checked_mul(factor).and_then(|v| total.checked_add(v))?;
        number.clear();
        unit.clear();
        Some(())
    };

    for c in input.chars() {
        if c.is_ascii_digit() {
            if !unit.is_empty() {
                flush(&mut number, &mut unit)?;
            }
            number.push(c);
            seen_any = true;
        } else if c.is_ascii_alphabetic() {
            if number.is_empty() {
                return None;
            }
            unit.push(c);
        } else if c.is_whitespace() || c == ',' {
            continue;
        } else {
            return None;
        }
    }
    flush(&mut number, &mut unit)?;

    if seen_any {
        Some(total)
    } else {
        None
    }
}

fn invalid(raw: &str) -> String {
    format!("Unrecognised duration '{}'", raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_forms() {
        assert_eq!(parse_duration_minutes("90"), Ok(90));
        assert_eq!(parse_duration_minutes(" 45m "), Ok(45));
        assert_eq!(parse_duration_minutes("1h 30m"), Ok(90));
        assert_eq!(parse_duration_minutes("1h30m"), Ok(90));
        assert_eq!(parse_duration_minutes("2 hours"), Ok(120));
        assert_eq!(parse_duration_minutes("1 hour, 15 minutes"), Ok(75));
        assert_eq!(parse_duration_minutes("1:15"), Ok(75));
        assert_eq!(parse_duration_minutes("30 Mins"), Ok(30));
    }

    #[test]
    fn rejects_nonsense_and_out_of_range() {
        assert!(parse_duration_minutes("").is_err());
        assert!(parse_duration_minutes("soon").is_err());
        assert!(parse_duration_minutes("10 days").is_err());
        assert!(parse_duration_minutes("0").is_err());
        assert!(parse_duration_minutes("-5").is_err());
        assert!(parse_duration_minutes("25h").is_err());
        assert!(parse_duration_minutes("1:75").is_err());
        assert!(parse_duration_minutes("h").is_err());
    }

    #[test]
    fn oversized_numbers_are_rejected_not_wrapped() {
        assert!(parse_duration_minutes("999999999999999999h").is_err());
        assert!(parse_duration_minutes("999999999999999999:00").is_err());
        assert!(parse_duration_minutes("4611686018427387905h").is_err());
        assert!(parse_duration_minutes("99999999999999999999").is_err());
        assert!(parse_duration_minutes("1h 9223372036854775807m").is_err());
    }

    #[test]
    fn negative_clock_parts_are_rejected() {
        assert!(parse_duration_minutes("2:-30").is_err());
        assert!(parse_duration_minutes("-1:30").is_err());
    }

    #[test]
    fn converts_to_chrono_duration() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::minutes(60));
    }
}
