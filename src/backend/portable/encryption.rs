use super::constants::SBOX;
use super::util::{add_round_key, dbl};

/// Core AES encryption function. Encrypts a 16 byte block in place using the provided round keys.
#[inline(always)]
pub(crate) fn encrypt_block(state: &mut [u8; 16], round_keys: &[[u8; 16]]) {
    let last_key_idx = round_keys.len() - 1;

    // add first round key to state
    add_round_key(state, &round_keys[0]);

    // perform all rounds except for the last
    for round_key in &round_keys[1..last_key_idx] {
        sub_bytes(state);
        shift_rows(state);
        mix_columns(state);
        add_round_key(state, round_key);
    }

    // last round skips mixcolumns step
    sub_bytes(state);
    shift_rows(state);
    add_round_key(state, &round_keys[last_key_idx]);
}

/// SubBytes step. Each byte is substituted using the SBOX.
#[inline(always)]
pub(crate) fn sub_bytes(state: &mut [u8; 16]) {
    for byte in state {
        *byte = SBOX[*byte as usize];
    }
}

/// ShiftRows step.
/// The 0th row does not change.
/// The first row shifts left by one position.
/// The second row shifts left by two positions.
/// The third row shifts left by three positions.
#[inline(always)]
pub(crate) fn shift_rows(state: &mut [u8; 16]) {
    let s = *state;

    // row 1 (1,5,9,13): left rotate by 1
    state[1] = s[5];
    state[5] = s[9];
    state[9] = s[13];
    state[13] = s[1];

    // row 2 (2,6,10,14): left rotate by 2
    state[2] = s[10];
    state[6] = s[14];
    state[10] = s[2];
    state[14] = s[6];

    // row 3 (3,7,11,15): left rotate by 3
    state[3] = s[15];
    state[7] = s[3];
    state[11] = s[7];
    state[15] = s[11];
}

/// MixColumns step. Each column is multiplied by a constant matrix using Galois field multiplication.
/// [ d0 ]      [ 2  3  1  1 ]  [ b0 ]
/// | d1 |  =   | 1  2  3  1 |  | b1 |
/// | d2 |      | 1  1  2  3 |  | b2 |
/// [ d3 ]      [ 3  1  1  2 ]  [ b3 ]
#[inline(always)]
pub(crate) fn mix_columns(state: &mut [u8; 16]) {
    // optimisation technique from https://crypto.stackexchange.com/a/71206
    for col in 0..4 {
        let i = col * 4;
        let (a, b, c, d) = (state[i], state[i + 1], state[i + 2], state[i + 3]);
        state[i] = dbl(a ^ b) ^ b ^ c ^ d; /* 2a + 3b + 1c + 1d */
        state[i + 1] = dbl(b ^ c) ^ c ^ d ^ a; /* 1a + 2b + 3c + 1d */
        state[i + 2] = dbl(c ^ d) ^ d ^ a ^ b; /* 1a + 1b + 2c + 3d */
        state[i + 3] = dbl(d ^ a) ^ a ^ b ^ c; /* 3a + 1b + 1c + 2d */
    }
}
