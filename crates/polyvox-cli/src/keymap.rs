//! Computer-keyboard note layout.
//!
//! The bottom letter row of a QWERTZ keyboard plays one chromatic octave,
//! with the row above supplying the black keys:
//!
//! ```text
//!   s d   g h j
//!  y x c v b n m ,
//! ```
//!
//! `y` is key 40 (middle C) and `,` is key 52, one octave up.

/// Characters in key order, starting at [`FIRST_KEY`].
pub const KEY_ROW: [char; 13] = [
    'y', 's', 'x', 'd', 'c', 'v', 'g', 'b', 'h', 'n', 'j', 'm', ',',
];

/// Key number of the first character in [`KEY_ROW`].
pub const FIRST_KEY: i32 = 40;

/// Key number for a keyboard character, case-insensitive.
pub fn key_for_char(c: char) -> Option<i32> {
    let lower = c.to_ascii_lowercase();
    KEY_ROW
        .iter()
        .position(|&k| k == lower)
        .and_then(|i| i32::try_from(i).ok())
        .map(|i| FIRST_KEY + i)
}
