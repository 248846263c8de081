use super::constants::SBOX_INV;
use super::util::{add_round_key, dbl};

/// Core AES decryption function. Decrypts a 16 byte block in place using the provided
/// (encryption) round keys, applied in reverse.
#[inline(always)]
pub(crate) fn decrypt_block(state: &mut [u8; 16], round_keys: &[[u8; 16]]) {
    let last_key_idx = round_keys.len() - 1;

    add_round_key(state, &round_keys[last_key_idx]);

    for round_key in round_keys[1..last_key_idx].iter().rev() {
        shift_rows_inv(state);
        sub_bytes_inv(state);
        add_round_key(state, round_key);
        mix_columns_inv(state);
    }

    shift_rows_inv(state);
    sub_bytes_inv(state);
    add_round_key(state, &round_keys[0]);
}

/// Inverse SubBytes step. Each byte is substituted using the inverse SBOX.
#[inline(always)]
pub(crate) fn sub_bytes_inv(state: &mut [u8; 16]) {
    for byte in state {
        *byte = SBOX_INV[*byte as usize];
    }
}

/// Inverse ShiftRows step. Row `r` shifts right by `r` positions.
#[inline(always)]
pub(crate) fn shift_rows_inv(state: &mut [u8; 16]) {
    // state is stored as columns: [c0, c0, c0, c0, c1, ... c1, c2, ... c2, ...]
    // for row,col of updated state, new value is at ((col + 4 - row) & 3) * 4 + row
    let s = *state;
    for row in 1..4 {
        for col in 0..4 {
            state[col * 4 + row] = s[((col + 4 - row) & 3) * 4 + row];
        }
    }
}

/// Inverse MixColumns step.
/// [ b0 ]      [ 14  11  13  09 ]  [ d0 ]
/// | b1 |  =   | 09  14  11  13 |  | d1 |
/// | b2 |      | 13  09  14  11 |  | d2 |
/// [ b3 ]      [ 11  13  09  14 ]  [ d3 ]
#[inline(always)]
pub(crate) fn mix_columns_inv(state: &mut [u8; 16]) {
    for col in 0..4 {
        let i = col * 4;
        let (a, b, c, d) = (state[i], state[i + 1], state[i + 2], state[i + 3]);
        let x = dbl(a ^ b ^ c ^ d); /* 2a + 2b + 2c + 2d */
        let y = dbl(x ^ a ^ c); /* 6a + 4b + 6c + 4d */
        let z = dbl(x ^ b ^ d); /* 4a + 6b + 4c + 6d */
        state[i] = dbl(y ^ a ^ b) ^ b ^ c ^ d; /* 14a + 11b + 13c + 09d */
        state[i + 1] = dbl(z ^ b ^ c) ^ c ^ d ^ a; /* 09a + 14b + 11c + 13d */
        state[i + 2] = dbl(y ^ c ^ d) ^ d ^ a ^ b; /* 13a + 09b + 14c + 11d */
        state[i + 3] = dbl(z ^ d ^ a) ^ a ^ b ^ c; /* 11a + 13b + 09c + 14d */
    }
}
