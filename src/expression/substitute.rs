//! Textual variable substitution.

/// Replace every occurrence of `name` in `text` with `value`.
///
/// When the character before an occurrence is a closing parenthesis or the
/// last digit of a complete number, a `*` is inserted so that `2Width`
/// multiplies. A digit that ends a symbol (`X2` in `X2Y`) does not count.
pub(super) fn replace_variable(text: &str, name: &str, value: f32) -> String {
    if name.is_empty() {
        return text.to_string();
    }

    let formatted = value.to_string();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find(name) {
        out.push_str(&rest[..idx]);
        if needs_multiplication(&out) {
            out.push('*');
        }
        out.push_str(&formatted);
        rest = &rest[idx + name.len()..];
    }
    out.push_str(rest);

    out
}

/// Whether the text produced so far ends in something a value can multiply.
fn needs_multiplication(before: &str) -> bool {
    let mut chars = before.chars().rev();
    match chars.next() {
        Some(')') => true,
        Some(c) if c.is_ascii_digit() || c == '.' => ends_in_number(before),
        _ => false,
    }
}

/// Scan back over a trailing run of digits: a letter or underscore means the
/// run belongs to a symbol, a second decimal point means it is not a number.
fn ends_in_number(before: &str) -> bool {
    let mut seen_point = false;
    for c in before.chars().rev() {
        match c {
            '0'..='9' => {}
            '.' if seen_point => return false,
            '.' => seen_point = true,
            c if c.is_ascii_alphabetic() || c == '_' => return false,
            _ => return true,
        }
    }
    true
}
