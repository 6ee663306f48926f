use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};

const TEMP_PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%&*";

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Fails for a wrong password and for a stored hash that does not parse.
pub fn verify_password(password: &str, hashed: &str) -> Result<(), password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

/// Random password handed to a newly created employee.
pub fn generate_temporary_password(len: usize) -> String {
    (0..len)
        .map(|_| {
            let idx = (OsRng.next_u32() as usize) % TEMP_PASSWORD_ALPHABET.len();
            TEMP_PASSWORD_ALPHABET[idx] as char
        })
        .collect()
}

pub fn random_u64() -> u64 {
    OsRng.next_u64()
}
