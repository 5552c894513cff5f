// Random password generation
use rand_core::{OsRng, RngCore};

const CHARSET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const GROUP_LEN: usize = 5;
const GROUPS: usize = 4;

// Largest multiple of the charset size that fits in a byte, bytes above it are
// redrawn so every character stays equally likely
const SAMPLE_LIMIT: u8 = (256 / CHARSET.len() * CHARSET.len()) as u8;

// Generates a password like xxxxx-xxxxx-xxxxx-xxxxx from OS randomness
pub fn generate_password() -> String {
    let mut password = String::with_capacity(GROUPS * (GROUP_LEN + 1) - 1);
    let mut pool = [0u8; 32];
    let mut next = pool.len();

    for i in 0..GROUPS * GROUP_LEN {
        if i % GROUP_LEN == 0 && i != 0 {
            password.push('-');
        }

        let byte = loop {
            if next == pool.len() {
                OsRng.fill_bytes(&mut pool);
                next = 0;
            }
            let byte = pool[next];
            next += 1;
            if byte < SAMPLE_LIMIT {
                break byte;
            }
        };
        password.push(CHARSET[byte as usize % CHARSET.len()] as char);
    }

    password
}
