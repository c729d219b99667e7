//! SMS segment accounting.

/// GSM 03.38 basic character set.
const GSM_7BIT_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// Extension table characters; each is sent as an escape plus a septet.
const GSM_7BIT_EXTENSION: &str = "^{}\\[~]|€";

/// Septets a character occupies in GSM 7-bit, or `None` if it needs UCS-2.
fn gsm_septets(c: char) -> Option<u32> {
    if GSM_7BIT_BASIC.contains(c) {
        Some(1)
    } else if GSM_7BIT_EXTENSION.contains(c) {
        Some(2)
    } else {
        None
    }
}

/// Number of SMS segments a body occupies.
/// GSM 7-bit: 160 septets single, 153 per part when concatenated.
/// UCS-2: 70 UTF-16 units single, 67 per part.
pub fn calculate_segments(body: &str) -> u32 {
    if body.is_empty() {
        return 1;
    }

    let gsm: Option<u32> = body.chars().map(gsm_septets).sum();
    let (units, single, multi) = match gsm {
        Some(septets) => (septets, 160, 153),
        None => (body.encode_utf16().count() as u32, 70, 67),
    };

    if units <= single {
        1
    } else {
        units.div_ceil(multi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gsm_boundaries() {
        assert_eq!(calculate_segments("Hello"), 1);
        assert_eq!(calculate_segments(&"A".repeat(160)), 1);
        assert_eq!(calculate_segments(&"A".repeat(161)), 2);
        assert_eq!(calculate_segments(&"B".repeat(306)), 2);
        assert_eq!(calculate_segments(&"C".repeat(307)), 3);
    }

    #[test]
    fn test_unicode_boundaries() {
        assert_eq!(calculate_segments(&"\u{1F600}".repeat(10)), 1);
        assert_eq!(calculate_segments(&format!("{}\u{1F600}", "A".repeat(68))), 1);
        assert_eq!(calculate_segments(&format!("{}\u{1F600}", "A".repeat(69))), 2);
    }

    #[test]
    fn test_astral_characters_count_as_two_units() {
        assert_eq!(calculate_segments(&"\u{1F600}".repeat(35)), 1);
        assert_eq!(calculate_segments(&"\u{1F600}".repeat(40)), 2);
    }

    #[test]
    fn test_extension_characters_take_two_septets() {
        assert_eq!(calculate_segments(&"{".repeat(80)), 1);
        assert_eq!(calculate_segments(&"{".repeat(100)), 2);
        assert_eq!(calculate_segments(&format!("{}€", "A".repeat(159))), 2);
    }

    #[test]
    fn test_gsm_accents_stay_7bit() {
        assert_eq!(calculate_segments(&"é".repeat(160)), 1);
        assert_eq!(calculate_segments(&"ç".repeat(71)), 2);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(calculate_segments(""), 1);
    }
}
