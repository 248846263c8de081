use super::constants::{RCON, SBOX};

#[inline(always)]
fn xor_words(a: &[u8; 4], b: &[u8; 4]) -> [u8; 4] {
    [a[0] ^ b[0], a[1] ^ b[1], a[2] ^ b[2], a[3] ^ b[3]]
}

/// AES key schedule. Returns a vector of 11, 13, or 15 round keys, corresponding with AES-128,
/// AES-192, and AES-256, respectively. The extra round key is the initial round key, which is
/// simply the original key.
///
/// The caller guarantees `key` is 16, 24, or 32 bytes long.
pub(crate) fn expand_key(key: &[u8]) -> Vec<[u8; 16]> {
    // Variable names match FIPS-197, NIST specification: https://doi.org/10.6028/NIST.FIPS.197-upd1
    // Nk   The number of 32-bit words comprising the key
    // Nr   The number of rounds. 10, 12, and 14 for AES-128, AES-192, and AES-256, respectively
    // w    The result of the key schedule, an array of words that form round keys
    // Nw   The total number of words generated by the key schedule (including initial key)
    let nk = key.len() / 4;
    let nr = nk + 6;
    let nw = (nr + 1) * 4;

    let mut w: Vec<[u8; 4]> = vec![[0u8; 4]; nw];

    // first nk words of w are filled with the initial key
    for (i, byte) in key.iter().enumerate() {
        w[i / 4][i % 4] = *byte;
    }

    let mut temp = w[nk - 1];
    for i in nk..nw {
        if i % nk == 0 {
            // rot_word, sub_word, and rcon on temp
            temp = [
                SBOX[temp[1] as usize] ^ RCON[i / nk],
                SBOX[temp[2] as usize],
                SBOX[temp[3] as usize],
                SBOX[temp[0] as usize],
            ];
        } else if nk == 8 && i % nk == 4 {
            // additional substitution on temp for AES-256 only
            temp = temp.map(|b| SBOX[b as usize]);
        }

        // w[i] = temp ⊕ w[i − Nk]
        w[i] = xor_words(&temp, &w[i - nk]);
        temp = w[i];
    }

    // group words into round keys; byte order matches the column-major state
    let mut round_keys = vec![[0u8; 16]; nr + 1];
    for (round, rk) in round_keys.iter_mut().enumerate() {
        for col in 0..4 {
            rk[col * 4..col * 4 + 4].copy_from_slice(&w[round * 4 + col]);
        }
    }

    round_keys
}
