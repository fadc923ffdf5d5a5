use memchr::memchr;

/// Bytes per unit for a speed argument with no suffix (MiB/s).
pub const DEFAULT_SPEED_UNIT: u64 = 1024 * 1024;

/// Error produced when a `--speed` argument cannot be parsed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SpeedParseError {
    /// The argument was empty.
    #[error("speed must not be empty")]
    Empty,
    /// The numeric part is not a non-negative decimal number.
    #[error("invalid speed value '{0}'")]
    Invalid(String),
    /// The trailing unit is not one of `K`, `M`, or `G`.
    #[error("invalid speed suffix '{0}' (expected K, M, or G)")]
    Suffix(char),
    /// The value does not fit in 64 bits of bytes per second.
    #[error("speed '{0}' is too large")]
    TooLarge(String),
}

/// Parses a throughput limit into bytes per second.
///
/// Accepts a decimal number with an optional binary unit suffix:
/// `K` (KiB/s), `M` (MiB/s), or `G` (GiB/s), case-insensitive. A bare number
/// is read as MiB/s. Fractions are truncated to whole bytes. `0` disables
/// throttling.
///
/// # Examples
///
/// ```
/// use bandwidth::parse_speed;
///
/// assert_eq!(parse_speed("10").unwrap(), 10 * 1024 * 1024);
/// assert_eq!(parse_speed("512K").unwrap(), 512 * 1024);
/// assert_eq!(parse_speed("1.5g").unwrap(), 3 * 512 * 1024 * 1024);
/// assert_eq!(parse_speed("0").unwrap(), 0);
/// ```
pub fn parse_speed(text: &str) -> Result<u64, SpeedParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SpeedParseError::Empty);
    }

    let (number, unit) = split_unit(text)?;
    let (integer, fraction, denominator) = parse_decimal(number, text)?;

    let too_large = || SpeedParseError::TooLarge(text.to_owned());
    let whole = integer.checked_mul(unit).ok_or_else(too_large)?;
    let partial = fraction.checked_mul(unit).ok_or_else(too_large)? / denominator;
    let total = whole.checked_add(partial).ok_or_else(too_large)?;

    u64::try_from(total).map_err(|_| too_large())
}

fn split_unit(text: &str) -> Result<(&str, u128), SpeedParseError> {
    let Some(last) = text.chars().last() else {
        return Err(SpeedParseError::Empty);
    };
    if last.is_ascii_digit() || last == '.' {
        return Ok((text, u128::from(DEFAULT_SPEED_UNIT)));
    }

    let unit = match last.to_ascii_uppercase() {
        'K' => 1u128 << 10,
        'M' => 1u128 << 20,
        'G' => 1u128 << 30,
        _ => return Err(SpeedParseError::Suffix(last)),
    };
    Ok((&text[..text.len() - last.len_utf8()], unit))
}

/// Splits `number` into integer digits, fractional digits, and `10^fraction_len`.
fn parse_decimal(number: &str, original: &str) -> Result<(u128, u128, u128), SpeedParseError> {
    let invalid = || SpeedParseError::Invalid(original.to_owned());
    let bytes = number.as_bytes();

    let (integer_text, fraction_text) = match memchr(b'.', bytes) {
        Some(position) => (&number[..position], &number[position + 1..]),
        None => (number, ""),
    };

    if integer_text.is_empty() && fraction_text.is_empty() {
        return Err(invalid());
    }
    if !integer_text.bytes().all(|b| b.is_ascii_digit())
        || !fraction_text.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let too_large = || SpeedParseError::TooLarge(original.to_owned());
    let integer = if integer_text.is_empty() {
        0
    } else {
        integer_text.parse::<u128>().map_err(|_| too_large())?
    };

    // Digits beyond nanobyte precision cannot change a truncated byte count.
    let fraction_text = &fraction_text[..fraction_text.len().min(18)];
    let (fraction, denominator) = if fraction_text.is_empty() {
        (0, 1)
    } else {
        let digits = u32::try_from(fraction_text.len()).map_err(|_| invalid())?;
        let value = fraction_text.parse::<u128>().map_err(|_| invalid())?;
        (value, 10u128.pow(digits))
    };

    Ok((integer, fraction, denominator))
}
