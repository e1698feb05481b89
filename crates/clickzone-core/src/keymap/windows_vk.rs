//! Windows Virtual Key (VK) codes and a US-layout character table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! `VK_TO_CHAR_TABLE` is a compile-time array of 256 `(unshifted, shifted)`
//! pairs indexed by VK code.  A `'\0'` entry means the key produces no
//! character.  It is a fallback only: the Windows platform asks the active
//! keyboard layout instead.

/// VK_SHIFT
pub const VK_SHIFT: u32 = 0x10;
/// VK_CAPITAL (Caps Lock)
pub const VK_CAPITAL: u32 = 0x14;

/// Returns the character a key produces on a US layout, honouring Shift.
///
/// Returns `None` for non-character keys and for codes above 0xFF.
pub fn us_layout_char(vk: u32, shift_down: bool) -> Option<char> {
    let (plain, shifted) = *VK_TO_CHAR_TABLE.get(vk as usize)?;
    let ch = if shift_down { shifted } else { plain };
    (ch != '\0').then_some(ch)
}

const VK_TO_CHAR_TABLE: [(char, char); 256] = {
    let mut t = [('\0', '\0'); 256];

    // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ────────────────────────────────
    let mut vk = 0x41;
    while vk <= 0x5A {
        let lower = (vk as u8 + 0x20) as char;
        t[vk] = (lower, vk as u8 as char);
        vk += 1;
    }

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ───────────────────────────────────
    t[0x30] = ('0', ')');
    t[0x31] = ('1', '!');
    t[0x32] = ('2', '@');
    t[0x33] = ('3', '#');
    t[0x34] = ('4', '$');
    t[0x35] = ('5', '%');
    t[0x36] = ('6', '^');
    t[0x37] = ('7', '&');
    t[0x38] = ('8', '*');
    t[0x39] = ('9', '(');

    // ── Control keys that produce characters ─────────────────────────────────
    t[0x08] = ('\u{8}', '\u{8}'); // VK_BACK
    t[0x09] = ('\t', '\t'); // VK_TAB
    t[0x0D] = ('\r', '\r'); // VK_RETURN
    t[0x1B] = ('\u{1b}', '\u{1b}'); // VK_ESCAPE
    t[0x20] = (' ', ' '); // VK_SPACE

    // ── OEM punctuation (US layout) ──────────────────────────────────────────
    t[0xBA] = (';', ':');
    t[0xBB] = ('=', '+');
    t[0xBC] = (',', '<');
    t[0xBD] = ('-', '_');
    t[0xBE] = ('.', '>');
    t[0xBF] = ('/', '?');
    t[0xC0] = ('`', '~');
    t[0xDB] = ('[', '{');
    t[0xDC] = ('\\', '|');
    t[0xDD] = (']', '}');
    t[0xDE] = ('\'', '"');

    t
};
