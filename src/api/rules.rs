//! Client matching and name rules checked before writes

use super::models::Client;

/// Reason a name may not be used for a client, if any.
///
/// Names that look like an address or an id would make lookups by token
/// ambiguous.
pub fn forbidden_name_reason(name: &str) -> Option<String> {
    if looks_like_ipv4(name) {
        Some(format!("The name {name} is forbidden. Looks like an IP"))
    } else if looks_like_id(name) {
        Some(format!("The name {name} is forbidden. Looks like an ID"))
    } else {
        None
    }
}

/// True if `value` contains four dot-separated groups of 1-3 digits.
///
/// Matches anywhere in the string, so `"host-10.0.0.1"` and `"1234.5.6.7"`
/// both count.
pub fn looks_like_ipv4(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    let short_digits =
        |s: &str| (1..=3).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());

    parts.windows(4).any(|w| {
        w[0].bytes().last().is_some_and(|b| b.is_ascii_digit())
            && short_digits(w[1])
            && short_digits(w[2])
            && w[3].bytes().next().is_some_and(|b| b.is_ascii_digit())
    })
}

/// True if `value` contains something shaped like a wg-easy client id:
/// `x-XXXX-XXXX-XXXX-x`, with at least one character on either end.
///
/// Widths are counted in UTF-16 code units and line terminators never count
/// as a character, the same way the web UI's pattern sees a name.
pub fn looks_like_id(value: &str) -> bool {
    const HYPHEN: u16 = b'-' as u16;
    let units: Vec<u16> = value.encode_utf16().collect();
    let any = |u: u16| !matches!(u, 0x000A | 0x000D | 0x2028 | 0x2029);

    (1..units.len()).any(|start| {
        let last = start + 15;
        let hyphens = [start, start + 5, start + 10, last];
        if last + 1 >= units.len() {
            return false;
        }
        hyphens.iter().all(|&i| units[i] == HYPHEN)
            && any(units[start - 1])
            && any(units[last + 1])
            && units[start + 1..last]
                .iter()
                .enumerate()
                .all(|(offset, &u)| offset % 5 == 4 || any(u))
    })
}

/// First client whose id, name or address equals `token`
pub fn find_client(clients: Vec<Client>, token: &str) -> Option<Client> {
    clients
        .into_iter()
        .find(|c| c.id == token || c.name == token || c.address == token)
}
