//! Face registration storage.
//!
//! A completed capture set becomes an account: a short random user id, a
//! `face_<id>` username, a unique 6-digit login code, and one stored photo per
//! pose. Logging in later only needs the code.

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::capture::CaptureSet;
use crate::detect::Direction;
use crate::frame::ImageEncoding;

pub const LOGIN_CODE_LEN: usize = 6;
pub const AUTH_TYPE_FACE: &str = "face";

const MAX_CODE_ATTEMPTS: usize = 32;

/// Require exactly six ASCII digits.
pub fn validate_login_code(code: &str) -> Result<()> {
    static LOGIN_CODE_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = LOGIN_CODE_RE.get_or_init(|| regex::Regex::new(r"^[0-9]{6}$").unwrap());
    if !re.is_match(code) {
        return Err(anyhow!(
            "login code must be exactly {} digits",
            LOGIN_CODE_LEN
        ));
    }
    Ok(())
}

/// Random code in 100000..=999999.
pub fn generate_login_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000u32..=999_999).to_string()
}

/// Eight lowercase hex characters.
pub fn generate_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    hex::encode(rng.gen::<[u8; 4]>())
}

/// Where a pose photo lives in the bucket.
pub fn photo_path(user_id: &str, direction: Direction, ts: u64, encoding: ImageEncoding) -> String {
    format!(
        "users/{user_id}/{user_id}_{}_{ts}.{}",
        direction.as_str(),
        encoding.extension()
    )
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub direction: Direction,
    pub path: String,
    pub content_type: String,
    pub byte_len: usize,
    /// Hex SHA-256 of the raw RGB capture.
    pub sha256: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub login_code: String,
    pub auth_type: String,
    pub created_at: u64,
    pub photos: Vec<PhotoRecord>,
}

impl Registration {
    pub fn photo(&self, direction: Direction) -> Option<&PhotoRecord> {
        self.photos.iter().find(|p| p.direction == direction)
    }
}

pub trait RegistrationStore {
    /// Persist the three captures and issue a login code.
    fn register(&mut self, captures: &CaptureSet) -> Result<Registration>;

    /// Look up a verified account by login code. The code is validated first.
    fn find_by_login_code(&self, code: &str) -> Result<Option<Registration>>;

    /// Photo records for a user id, in capture order. Empty for unknown users.
    fn photos(&self, user_id: &str) -> Result<Vec<PhotoRecord>>;

    /// Stored bytes for a photo path.
    fn photo_bytes(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

struct PreparedPhoto {
    record: PhotoRecord,
    bytes: Vec<u8>,
}

fn prepare_photos(
    captures: &CaptureSet,
    user_id: &str,
    encoding: ImageEncoding,
    ts: u64,
) -> Result<Vec<PreparedPhoto>> {
    captures
        .iter()
        .map(|image| {
            let bytes = image
                .encode(encoding)
                .with_context(|| format!("encoding {} capture", image.direction()))?;
            Ok(PreparedPhoto {
                record: PhotoRecord {
                    direction: image.direction(),
                    path: photo_path(user_id, image.direction(), ts, encoding),
                    content_type: encoding.content_type().to_string(),
                    byte_len: bytes.len(),
                    sha256: hex::encode(image.digest()),
                },
                bytes,
            })
        })
        .collect()
}

fn issue_login_code(rng: &mut StdRng, taken: impl Fn(&str) -> Result<bool>) -> Result<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_login_code(rng);
        if !taken(&code)? {
            return Ok(code);
        }
    }
    bail!(
        "could not issue a unique login code after {} attempts",
        MAX_CODE_ATTEMPTS
    )
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn default_encoding() -> ImageEncoding {
    if cfg!(feature = "ingest-images") {
        ImageEncoding::Jpeg
    } else {
        ImageEncoding::RawRgb
    }
}

// ----------------------------------------------------------------------------
// SQLite
// ----------------------------------------------------------------------------

pub struct SqliteRegistrationStore {
    conn: Connection,
    rng: StdRng,
    encoding: ImageEncoding,
}

impl SqliteRegistrationStore {
    pub fn open(db_path: &str) -> Result<Self> {
        Self::open_with(db_path, None)
    }

    /// Open with a fixed seed for ids and codes.
    pub fn open_with(db_path: &str, seed: Option<u64>) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening registration store {}", db_path))?;
        let mut store = Self {
            conn,
            rng: rng_from(seed),
            encoding: default_encoding(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS users (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT NOT NULL UNIQUE,
              username TEXT NOT NULL UNIQUE,
              face_login_code TEXT NOT NULL UNIQUE,
              auth_type TEXT NOT NULL,
              is_verified INTEGER NOT NULL DEFAULT 1,
              created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS face_photos (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_row INTEGER NOT NULL REFERENCES users(id),
              direction TEXT NOT NULL,
              path TEXT NOT NULL UNIQUE,
              content_type TEXT NOT NULL,
              byte_len INTEGER NOT NULL,
              sha256 TEXT NOT NULL,
              data BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_photos_user ON face_photos(user_row);
            "#,
        )?;
        Ok(())
    }

    fn load_photos(&self, user_row: i64) -> Result<Vec<PhotoRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT direction, path, content_type, byte_len, sha256 FROM face_photos WHERE user_row = ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![user_row])?;
        let mut photos = Vec::new();
        while let Some(row) = rows.next()? {
            let direction: String = row.get(0)?;
            let byte_len: i64 = row.get(3)?;
            photos.push(PhotoRecord {
                direction: direction.parse()?,
                path: row.get(1)?,
                content_type: row.get(2)?,
                byte_len: usize::try_from(byte_len)
                    .map_err(|_| anyhow!("corrupt photo row: negative byte_len"))?,
                sha256: row.get(4)?,
            });
        }
        Ok(photos)
    }
}

impl RegistrationStore for SqliteRegistrationStore {
    fn register(&mut self, captures: &CaptureSet) -> Result<Registration> {
        let created_at = now_s()?;
        let user_id = generate_user_id(&mut self.rng);
        let username = format!("face_{}", user_id);
        let conn = &self.conn;
        let login_code = issue_login_code(&mut self.rng, |code| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE face_login_code = ?1",
                    params![code],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })?;
        let photos = prepare_photos(captures, &user_id, self.encoding, created_at)?;

        let created_at_i64 =
            i64::try_from(created_at).map_err(|_| anyhow!("timestamp exceeds i64 range"))?;
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO users(user_id, username, face_login_code, auth_type, is_verified, created_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5)
            "#,
            params![user_id, username, login_code, AUTH_TYPE_FACE, created_at_i64],
        )?;
        let id = tx.last_insert_rowid();
        for photo in &photos {
            tx.execute(
                r#"
                INSERT INTO face_photos(user_row, direction, path, content_type, byte_len, sha256, data)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    id,
                    photo.record.direction.as_str(),
                    photo.record.path,
                    photo.record.content_type,
                    photo.record.byte_len as i64,
                    photo.record.sha256,
                    photo.bytes
                ],
            )?;
        }
        tx.commit()?;

        log::info!("registered {} with {} photos", username, photos.len());
        Ok(Registration {
            id,
            user_id,
            username,
            login_code,
            auth_type: AUTH_TYPE_FACE.to_string(),
            created_at,
            photos: photos.into_iter().map(|p| p.record).collect(),
        })
    }

    fn find_by_login_code(&self, code: &str) -> Result<Option<Registration>> {
        validate_login_code(code)?;
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, username, face_login_code, auth_type, created_at
                FROM users WHERE face_login_code = ?1 AND is_verified = 1
                "#,
                params![code],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, user_id, username, login_code, auth_type, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Registration {
            id,
            user_id,
            username,
            login_code,
            auth_type,
            created_at: u64::try_from(created_at)
                .map_err(|_| anyhow!("corrupt user row: negative created_at"))?,
            photos: self.load_photos(id)?,
        }))
    }

    fn photos(&self, user_id: &str) -> Result<Vec<PhotoRecord>> {
        let row: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            Some(id) => self.load_photos(id),
            None => Ok(Vec::new()),
        }
    }

    fn photo_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row(
                "SELECT data FROM face_photos WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?)
    }
}

// ----------------------------------------------------------------------------
// In-memory
// ----------------------------------------------------------------------------

pub struct InMemoryRegistrationStore {
    registrations: Vec<Registration>,
    blobs: HashMap<String, Vec<u8>>,
    rng: StdRng,
    encoding: ImageEncoding,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::with_seed(None)
    }

    pub fn with_seed(seed: Option<u64>) -> Self {
        Self {
            registrations: Vec::new(),
            blobs: HashMap::new(),
            rng: rng_from(seed),
            encoding: ImageEncoding::RawRgb,
        }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Default for InMemoryRegistrationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationStore for InMemoryRegistrationStore {
    fn register(&mut self, captures: &CaptureSet) -> Result<Registration> {
        let created_at = now_s()?;
        let user_id = generate_user_id(&mut self.rng);
        let registrations = &self.registrations;
        let login_code = issue_login_code(&mut self.rng, |code| {
            Ok(registrations.iter().any(|r| r.login_code == code))
        })?;
        let photos = prepare_photos(captures, &user_id, self.encoding, created_at)?;

        let mut records = Vec::with_capacity(photos.len());
        for photo in photos {
            self.blobs.insert(photo.record.path.clone(), photo.bytes);
            records.push(photo.record);
        }
        let registration = Registration {
            id: self.registrations.len() as i64 + 1,
            username: format!("face_{}", user_id),
            user_id,
            login_code,
            auth_type: AUTH_TYPE_FACE.to_string(),
            created_at,
            photos: records,
        };
        self.registrations.push(registration.clone());
        Ok(registration)
    }

    fn find_by_login_code(&self, code: &str) -> Result<Option<Registration>> {
        validate_login_code(code)?;
        Ok(self
            .registrations
            .iter()
            .find(|r| r.login_code == code)
            .cloned())
    }

    fn photos(&self, user_id: &str) -> Result<Vec<PhotoRecord>> {
        Ok(self
            .registrations
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.photos.clone())
            .unwrap_or_default())
    }

    fn photo_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(path).cloned())
    }
}

fn now_s() -> Result<u64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn capture_set() -> CaptureSet {
        let images = Direction::POSES
            .iter()
            .enumerate()
            .map(|(i, d)| {
                Frame::filled(4, 3, [i as u8 * 40, 120, 90])
                    .expect("frame")
                    .capture(*d)
            })
            .collect();
        CaptureSet::from_images(images).expect("capture set")
    }

    #[test]
    fn login_code_validation() {
        assert!(validate_login_code("123456").is_ok());
        for bad in ["12345", "1234567", "12a456", " 123456", "", "１２３４５６"] {
            assert!(validate_login_code(bad).is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn generated_codes_and_ids_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let code = generate_login_code(&mut rng);
            assert!(validate_login_code(&code).is_ok());
            assert!(!code.starts_with('0'));
            let id = generate_user_id(&mut rng);
            assert_eq!(id.len(), 8);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn photo_paths_follow_bucket_layout() {
        assert_eq!(
            photo_path("ab12cd34", Direction::Left, 1700000000, ImageEncoding::Jpeg),
            "users/ab12cd34/ab12cd34_left_1700000000.jpg"
        );
    }

    #[test]
    fn issue_login_code_skips_taken_codes() -> Result<()> {
        let mut probe = StdRng::seed_from_u64(9);
        let first = generate_login_code(&mut probe);

        let mut rng = StdRng::seed_from_u64(9);
        let code = issue_login_code(&mut rng, |c| Ok(c == first))?;
        assert_ne!(code, first);

        let mut rng = StdRng::seed_from_u64(9);
        assert!(issue_login_code(&mut rng, |_| Ok(true)).is_err());
        Ok(())
    }

    #[test]
    fn in_memory_register_and_find() -> Result<()> {
        let mut store = InMemoryRegistrationStore::with_seed(Some(5));
        let reg = store.register(&capture_set())?;
        assert_eq!(reg.username, format!("face_{}", reg.user_id));
        assert_eq!(reg.auth_type, AUTH_TYPE_FACE);
        assert_eq!(reg.photos.len(), 3);

        let front = reg.photo(Direction::Front).expect("front photo");
        assert_eq!(front.byte_len, 36);
        assert_eq!(store.photo_bytes(&front.path)?.map(|b| b.len()), Some(36));

        assert_eq!(store.photos(&reg.user_id)?, reg.photos);
        let found = store.find_by_login_code(&reg.login_code)?;
        assert_eq!(found, Some(reg));
        assert!(store.find_by_login_code("12x456").is_err());
        Ok(())
    }

    #[test]
    fn sqlite_register_and_find() -> Result<()> {
        let mut store =
            SqliteRegistrationStore::open_with(":memory:", Some(11))?.with_encoding(ImageEncoding::RawRgb);
        let first = store.register(&capture_set())?;
        let second = store.register(&capture_set())?;
        assert_ne!(first.login_code, second.login_code);
        assert_ne!(first.user_id, second.user_id);

        let found = store
            .find_by_login_code(&first.login_code)?
            .expect("registered user");
        assert_eq!(found, first);
        assert_eq!(store.photos(&first.user_id)?, first.photos);
        assert!(store.photos("nobody")?.is_empty());
        let right = found.photo(Direction::Right).expect("right photo");
        let bytes = store.photo_bytes(&right.path)?.expect("photo bytes");
        assert_eq!(bytes.len(), right.byte_len);
        Ok(())
    }

    #[test]
    fn sqlite_unknown_code_is_none() -> Result<()> {
        let store = SqliteRegistrationStore::open_with(":memory:", Some(2))?;
        assert!(store.find_by_login_code("000000")?.is_none());
        Ok(())
    }
}
