//! Member reference encoding
//!
//! Member references are weak references to the member's node. In the
//! indexed representation the entry key is the member's authorizable ID
//! with structural characters escaped, so any ID is a valid property name.

use crate::core_store::{NodeId, Value};

/// Characters that cannot appear verbatim in a node or property name
const ESCAPED: &[char] = &['%', '/', ':', '[', ']', '*', '|', '\'', '"'];

/// Escape `id` into a name usable as a property or node name
///
/// Every structural or control character becomes `%XX` (uppercase hex of
/// each UTF-8 byte); the escape character itself is escaped, so the
/// mapping is injective and [`unescape_name`] inverts it. A lone `.` or
/// `..` gets its dots escaped as well.
pub fn escape_name(id: &str) -> String {
    if id == "." || id == ".." {
        return id.replace('.', "%2E");
    }

    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if ESCAPED.contains(&c) || c.is_control() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape_name`]; malformed escapes are kept literally
pub fn unescape_name(name: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Weak reference value pointing at a member's node
pub fn weak_reference(node: &NodeId) -> Value {
    Value::WeakReference(node.clone())
}
