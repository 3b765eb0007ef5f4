use super::types::WadName;

/// The `-` placeholder used by sidedefs for "no texture".
pub fn is_untextured(name: WadName) -> bool {
    name[0] == b'-' && name[1] == b'\0'
}

/// Whether a flat or texture name marks an open sky, e.g. `F_SKY1` for marker `SKY`.
pub fn is_sky(name: WadName, marker: &str) -> bool {
    !marker.is_empty() && name.contains(marker)
}

#[cfg(test)]
mod test {
    use super::{is_sky, is_untextured};
    use crate::types::WadName;
    use std::str::FromStr;

    fn name(value: &str) -> WadName {
        WadName::from_str(value).unwrap()
    }

    #[test]
    fn untextured_is_a_lone_dash() {
        assert!(is_untextured(name("-")));
        assert!(!is_untextured(name("-A")));
        assert!(!is_untextured(WadName::default()));
    }

    #[test]
    fn sky_is_a_substring_match() {
        assert!(is_sky(name("F_SKY1"), "SKY"));
        assert!(is_sky(name("sky3"), "sky"));
        assert!(!is_sky(name("FLOOR4_8"), "SKY"));
        assert!(!is_sky(name("F_SKY1"), ""));
    }
}
