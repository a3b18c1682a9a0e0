// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

/// Strips the delimiters from a quoted string or character and resolves its
/// `\` escapes: `\n \r \t \a \e \f` and the `\xHH \uHHHH \oOOO` numeric
/// forms; any other quoted character passes through unchanged.
pub fn dequote_string(quoted: &str) -> String {
    let symbols: Vec<char> = quoted.chars().collect();
    if symbols.len() < 2 {
        return String::new();
    }
    let mut result = String::new();
    let interior = &symbols[1..symbols.len() - 1];
    let mut pos = 0;
    while pos < interior.len() {
        let character = interior[pos];
        if character != '\\' {
            result.push(character);
            pos += 1;
            continue;
        }
        pos += 1;
        let quoted = match interior.get(pos) {
            Some(&quoted) => quoted,
            None => {
                result.push('\\');
                break;
            }
        };
        pos += 1;
        match quoted {
            'a' => result.push('\u{7}'),
            'e' => result.push('\u{1b}'),
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            'f' => result.push('\u{c}'),
            't' => result.push('\t'),
            'x' => pos = push_numeric(&mut result, interior, pos, 16, 2),
            'u' => pos = push_numeric(&mut result, interior, pos, 16, 4),
            'o' => pos = push_numeric(&mut result, interior, pos, 8, 3),
            other => result.push(other),
        }
    }
    result
}

fn push_numeric(
    result: &mut String,
    interior: &[char],
    mut pos: usize,
    radix: u32,
    max_digits: usize,
) -> usize {
    let mut value = 0u32;
    for _ in 0..max_digits {
        let digit = match interior.get(pos).and_then(|c| c.to_digit(radix)) {
            Some(digit) => digit,
            None => break,
        };
        value = value * radix + digit;
        pos += 1;
    }
    if let Some(character) = char::from_u32(value) {
        result.push(character);
    }
    pos
}
