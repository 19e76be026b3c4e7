// ============================================================
// Layer 6 - Participant IDs
// ============================================================
// Participants are recruited with platform IDs that must not
// appear in the published tables. Each parsed participant gets
// a fresh random ID instead.
//
// Reference: rand crate documentation (Rng::gen_range)

use rand::Rng;

/// Characters an ID is drawn from: A-Z then 0-9
const ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default ID length
pub const ID_LEN: usize = 10;

/// Draw a random participant ID of `size` characters.
pub fn participant_id(size: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..size)
        .map(|_| ID_CHARS[rng.gen_range(0..ID_CHARS.len())] as char)
        .collect()
}
