//! Static font-metric tables for the generic fallback families.
//!
//! These are used whenever no handwriting font has been loaded yet. Widths are
//! in em units (relative to font size) and only approximate the real system
//! fonts a browser would pick for the same CSS stack; they are close enough to
//! keep page breaks stable between the preview and the exported pages.
//! Tables cover ASCII 0x20..=0x7E (95 printable characters), index = code - 32.

use serde::{Deserialize, Serialize};

use crate::layout::measure::GlyphAdvance;

// ────────────────────────────────────────────────────────────────────────────
// Generic family enum
// ────────────────────────────────────────────────────────────────────────────

/// Fallback families that are always available for measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericFamily {
    /// Old-style serif, the studio default.
    #[default]
    Serif,
    /// Humanist sans-serif.
    Sans,
    /// Fixed-pitch.
    Mono,
}

impl GenericFamily {
    /// CSS fallback stack for this family, most preferred first.
    pub fn css_stack(&self) -> &'static [&'static str] {
        match self {
            GenericFamily::Serif => &["ui-serif", "Georgia", "Times New Roman", "serif"],
            GenericFamily::Sans => &["ui-sans-serif", "system-ui", "Helvetica", "Arial", "sans-serif"],
            GenericFamily::Mono => &["ui-monospace", "Courier New", "monospace"],
        }
    }

    /// Human name shown while no generated font is active.
    pub fn display_name(&self) -> &'static str {
        match self {
            GenericFamily::Serif => "Fallback serif",
            GenericFamily::Sans => "Fallback sans",
            GenericFamily::Mono => "Fallback mono",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a generic family.
///
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    pub family: GenericFamily,
    widths: [f32; 95],
    /// Fallback width for characters outside the table.
    pub average_char_width: f32,
}

impl GlyphAdvance for FontMetricTable {
    fn advance_em(&self, ch: char) -> f32 {
        let code = ch as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else if ch == '\t' {
            self.widths[0] * 4.0
        } else {
            self.average_char_width
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables
// ────────────────────────────────────────────────────────────────────────────

static SERIF_TABLE: FontMetricTable = FontMetricTable {
    family: GenericFamily::Serif,
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.25, 0.33, 0.41, 0.50, 0.50, 0.83, 0.78, 0.18, 0.33, 0.33, 0.50, 0.56, 0.25, 0.33, 0.25, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.56, 0.56, 0.56, 0.44, 0.92,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.72, 0.67, 0.67, 0.72, 0.61, 0.56, 0.72, 0.72, 0.33, 0.39, 0.72, 0.61, 0.89,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.72, 0.56, 0.72, 0.67, 0.56, 0.61, 0.72, 0.72, 0.94, 0.72, 0.72, 0.61,
        // [     \     ]     ^     _     `
        0.33, 0.28, 0.33, 0.47, 0.50, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.44, 0.50, 0.44, 0.50, 0.44, 0.33, 0.50, 0.50, 0.28, 0.28, 0.50, 0.28, 0.78,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.50, 0.50, 0.50, 0.50, 0.33, 0.39, 0.28, 0.50, 0.50, 0.72, 0.50, 0.50, 0.44,
        // {     |     }     ~
        0.48, 0.20, 0.48, 0.54,
    ],
    average_char_width: 0.50,
};

static SANS_TABLE: FontMetricTable = FontMetricTable {
    family: GenericFamily::Sans,
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.28, 0.28, 0.36, 0.56, 0.56, 0.89, 0.67, 0.19, 0.33, 0.33, 0.39, 0.58, 0.28, 0.33, 0.28, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.58, 0.58, 0.58, 0.56, 1.02,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.67, 0.67, 0.72, 0.72, 0.67, 0.61, 0.78, 0.72, 0.28, 0.50, 0.67, 0.56, 0.83,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.78, 0.67, 0.78, 0.72, 0.67, 0.61, 0.72, 0.67, 0.94, 0.67, 0.67, 0.61,
        // [     \     ]     ^     _     `
        0.28, 0.28, 0.28, 0.47, 0.56, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.56, 0.56, 0.50, 0.56, 0.56, 0.28, 0.56, 0.56, 0.22, 0.22, 0.50, 0.22, 0.83,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.56, 0.56, 0.56, 0.56, 0.33, 0.50, 0.28, 0.56, 0.50, 0.72, 0.50, 0.50, 0.50,
        // {     |     }     ~
        0.33, 0.26, 0.33, 0.58,
    ],
    average_char_width: 0.54,
};

static MONO_TABLE: FontMetricTable = FontMetricTable {
    family: GenericFamily::Mono,
    widths: [0.60; 95],
    average_char_width: 0.60,
};

/// Returns the static metric table for a generic family.
pub fn get_metrics(family: GenericFamily) -> &'static FontMetricTable {
    match family {
        GenericFamily::Serif => &SERIF_TABLE,
        GenericFamily::Sans => &SANS_TABLE,
        GenericFamily::Mono => &MONO_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
