// Text helpers for notifications and terminal output

const MARKDOWN_SPECIAL_CHARS: [char; 21] = [
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '<', '&', '#', '+', '-', '=', '|', '{',
    '}', '.', '!',
];

/// Escape text for Telegram MarkdownV2.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn pluralize(word: &str, count: u64) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Format an ETH amount with at most `max_fraction_digits` decimals, trailing
/// zeros trimmed and thousands grouped: `1234.56789` -> `1,234.5679`.
/// Ties round away from zero.
pub fn round_eth(value: f64, max_fraction_digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    // Exact decimal expansion of the double; 1074 digits reach the smallest subnormal
    let exact = format!("{:.1074}", value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let keep = max_fraction_digits.min(frac_part.len());

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part[..keep].bytes())
        .map(|b| b - b'0')
        .collect();
    if frac_part.as_bytes().get(keep).is_some_and(|&d| d >= b'5') {
        round_up(&mut digits);
    }

    let int_len = digits.len() - keep;
    let int_digits: String = digits[..int_len].iter().map(|d| (b'0' + d) as char).collect();
    let frac_digits: String = digits[int_len..].iter().map(|d| (b'0' + d) as char).collect();
    let frac_digits = frac_digits.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_digits.len() + int_digits.len() / 3);
    for (i, c) in int_digits.chars().enumerate() {
        if i > 0 && (int_digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let negative = value < 0.0 && (int_digits != "0" || !frac_digits.is_empty());
    let sign = if negative { "-" } else { "" };

    if frac_digits.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_digits)
    }
}

/// Add one unit in the last place of a decimal digit string.
fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

/// `0x1234...abcd` for anything longer than 10 characters.
pub fn shorten_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 10 {
        return hash.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Addresses and hashes compare case-insensitively (EIP-55 checksums differ only in case).
pub fn compare_hashes(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
