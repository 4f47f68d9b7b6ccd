//! Input pre-classification.
//!
//! Parsers look at these coarse signals before tokenising, to decide which
//! exception shapes are worth trying. False positives are fine: every shape
//! still has to match its own pattern.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct ValueTraits: u32 {
        const HAS_DIGITS     = 1 << 0;
        const HAS_ALPHA      = 1 << 1;
        const MULTI_LINE     = 1 << 2;
        const HAS_COMMA      = 1 << 3;
        const HAS_SEMICOLON  = 1 << 4;
        const HAS_AT         = 1 << 5;
        const HAS_PAREN      = 1 << 6;
        const HAS_COLON      = 1 << 7;
        const HAS_PLUS       = 1 << 8;
        /// `length`/`width`/`height` or `(l)`/`(w)`/`(h)` labels.
        const LABELLED_LWH   = 1 << 9;
        const PALLET_WORD    = 1 << 10;
        const EMAIL          = 1 << 11;
    }
}

impl ValueTraits {
    pub(crate) fn scan(input: &str) -> Self {
        let mut traits = ValueTraits::empty();
        let lower = input.to_lowercase();

        for (c, flag) in [
            ('\n', ValueTraits::MULTI_LINE),
            (',', ValueTraits::HAS_COMMA),
            (';', ValueTraits::HAS_SEMICOLON),
            ('@', ValueTraits::HAS_AT),
            ('(', ValueTraits::HAS_PAREN),
            (':', ValueTraits::HAS_COLON),
            ('+', ValueTraits::HAS_PLUS),
        ] {
            if input.contains(c) {
                traits |= flag;
            }
        }
        if input.chars().any(|c| c.is_ascii_digit()) {
            traits |= ValueTraits::HAS_DIGITS;
        }
        if input.chars().any(char::is_alphabetic) {
            traits |= ValueTraits::HAS_ALPHA;
        }

        let lwh = ["length", "width", "height"].iter().all(|w| lower.contains(w))
            || ["(l)", "(w)", "(h)"].iter().all(|w| lower.contains(w));
        if lwh {
            traits |= ValueTraits::LABELLED_LWH;
        }
        if ["pallet", "plt"].iter().any(|w| lower.contains(w)) {
            traits |= ValueTraits::PALLET_WORD;
        }
        if regex!(r"[\w.+-]+@[\w-]+\.[\w.-]+").is_match(input) {
            traits |= ValueTraits::EMAIL;
        }
        traits
    }
}
