use sha1::{Digest, Sha1};

pub fn stage2_from_password(password: &[u8]) -> [u8; 20] {
    let stage1 = Sha1::digest(password);
    let stage2 = Sha1::digest(stage1);
    stage2.into()
}

/// Verify the mysql_native_password token (auth_data) against the stored stage2 hash.
///
/// Stored form is SHA1(SHA1(password)) (20 bytes).
pub fn verify_native_password_token(
    salt: &[u8],
    stored_stage2: &[u8; 20],
    auth_data: &[u8],
) -> bool {
    if auth_data.len() != 20 {
        return false;
    }

    // token = stage1 XOR SHA1(salt + stage2)
    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(stored_stage2);
    let salt_stage2_hash: [u8; 20] = hasher.finalize().into();

    let mut stage1 = [0u8; 20];
    for (out, (a, b)) in stage1
        .iter_mut()
        .zip(auth_data.iter().zip(salt_stage2_hash.iter()))
    {
        *out = a ^ b;
    }

    let stage2_check: [u8; 20] = Sha1::digest(stage1).into();
    stage2_check == *stored_stage2
}

/// Checks a login against an optional password.
///
/// Without a configured password any credentials are accepted.
pub fn accept_login(salt: &[u8], auth_data: &[u8], stage2: Option<&[u8; 20]>) -> bool {
    match stage2 {
        None => true,
        Some(stage2) => verify_native_password_token(salt, stage2, auth_data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_token(salt: &[u8], password: &[u8]) -> Vec<u8> {
        let stage1: [u8; 20] = Sha1::digest(password).into();
        let stage2: [u8; 20] = Sha1::digest(stage1).into();
        let mut hasher = Sha1::new();
        hasher.update(salt);
        hasher.update(stage2);
        let mask: [u8; 20] = hasher.finalize().into();
        stage1.iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect()
    }

    #[test]
    fn native_password_round_trip() {
        let salt = b"01234567890123456789";
        let stored = stage2_from_password(b"secret");
        assert!(verify_native_password_token(salt, &stored, &client_token(salt, b"secret")));
        assert!(!verify_native_password_token(salt, &stored, &client_token(salt, b"wrong")));
        assert!(!verify_native_password_token(salt, &stored, &[]));
    }

    #[test]
    fn open_server_accepts_anything() {
        assert!(accept_login(b"salt", b"whatever", None));
        let stored = stage2_from_password(b"pw");
        assert!(!accept_login(b"salt", b"", Some(&stored)));
    }
}
