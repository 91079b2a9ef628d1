//! Code and token generation plus argon2id hashing of short codes.
//!
//! Codes are 6 digits, zero-padded, drawn uniformly from the full range so
//! leading zeros are as likely as any other digit. Tokens are 32 random bytes
//! hex-encoded; they go into emailed URLs and are unique by construction.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, ParamsBuilder, Version};
use rand::RngExt;

use crate::error::GateError;

/// Number of digits in an emailed verification code.
pub const CODE_LEN: usize = 6;

pub fn generate_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000u32))
}

pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

fn argon2() -> Argon2<'static> {
    // RFC 9106 low-memory parameters: 19 MiB, 2 iterations, 1 lane.
    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .build()
        .expect("static argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

pub fn hash_code(code: &str) -> Result<String, GateError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2()
        .hash_password(code.as_bytes(), &salt)
        .map_err(|e| GateError::Internal(anyhow::anyhow!("code hashing failed: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_code(code: &str, hash: &str) -> Result<bool, GateError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| GateError::Internal(anyhow::anyhow!("stored code hash is invalid: {e}")))?;
    match argon2().verify_password(code.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(GateError::Internal(anyhow::anyhow!(
            "code verification failed: {e}"
        ))),
    }
}
