use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stash_types::{Kind, ObjectHash};

use crate::codec::{Codec, CodecError, CodecResult};
use crate::hasher::ContentHasher;

/// Identity of a stored type: its kind plus a stable type name.
///
/// The name is written alongside every encoded value, so two types whose
/// fields encode to the same bytes still produce different blobs and
/// different hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    kind: Kind,
    name: &'static str,
}

impl TypeTag {
    pub const fn new(kind: Kind, name: &'static str) -> Self {
        Self { kind, name }
    }

    pub const fn kind(&self) -> Kind {
        self.kind
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Stored form of a value: the type name followed by the value itself.
#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    type_name: &'a str,
    object: &'a T,
}

#[derive(Deserialize)]
struct OwnedTagged<T> {
    #[serde(rename = "type")]
    type_name: String,
    object: T,
}

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "type")]
    type_name: String,
}

/// The object hash function: tagged canonical encoding followed by a
/// kind-domained digest.
///
/// `hash(x)` depends only on the bytes of the tagged encoding and the kind,
/// so it is stable across calls, processes and time, and
/// `hash(decode(encode(x)))` equals `hash(x)` for every deterministic
/// encoding. The stored blob is exactly those bytes, which is what lets
/// byte-level maintenance rehash blobs with [`hash_bytes`](Self::hash_bytes)
/// without knowing their Rust type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectHasher {
    codec: Codec,
}

impl ObjectHasher {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Encode an object as an instance of `tag`.
    pub fn encode<T: Serialize>(&self, tag: TypeTag, object: &T) -> CodecResult<Vec<u8>> {
        self.codec.encode(&Tagged {
            type_name: tag.name,
            object,
        })
    }

    /// Decode bytes written by [`encode`](Self::encode) for the same tag.
    ///
    /// Bytes written for another type are reported as
    /// [`CodecError::TypeMismatch`], even when the payload would decode.
    pub fn decode<T: DeserializeOwned>(&self, tag: TypeTag, bytes: &[u8]) -> CodecResult<T> {
        let mismatch = |actual: String| CodecError::TypeMismatch {
            expected: tag.name.to_string(),
            actual,
        };
        match self.codec.decode::<OwnedTagged<T>>(bytes) {
            Ok(tagged) if tagged.type_name == tag.name => Ok(tagged.object),
            Ok(tagged) => Err(mismatch(tagged.type_name)),
            Err(err) => match self.codec.decode::<Header>(bytes) {
                Ok(header) if header.type_name != tag.name => Err(mismatch(header.type_name)),
                _ => Err(err),
            },
        }
    }

    /// Hash an object as an instance of `tag`.
    pub fn hash<T: Serialize>(&self, tag: TypeTag, object: &T) -> CodecResult<ObjectHash> {
        let bytes = self.encode(tag, object)?;
        Ok(self.hash_bytes(tag.kind, &bytes))
    }

    /// Hash already-encoded bytes as a blob of `kind`.
    pub fn hash_bytes(&self, kind: Kind, bytes: &[u8]) -> ObjectHash {
        ContentHasher::for_kind(kind).hash(bytes)
    }

    /// Encode an object and hash the result in one pass.
    pub fn encode_and_hash<T: Serialize>(
        &self,
        tag: TypeTag,
        object: &T,
    ) -> CodecResult<(Vec<u8>, ObjectHash)> {
        let bytes = self.encode(tag, object)?;
        let hash = self.hash_bytes(tag.kind, &bytes);
        Ok((bytes, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WORDS: TypeTag = TypeTag::new(Kind::DataSet, "words");

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ridge {
        alpha: f64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Mean {
        mean: f64,
    }

    const RIDGE: TypeTag = TypeTag::new(Kind::Estimator, "ridge");
    const MEAN: TypeTag = TypeTag::new(Kind::Estimator, "mean");

    #[test]
    fn equal_objects_hash_equal() {
        let hasher = ObjectHasher::default();
        let a = hasher.hash(WORDS, &String::from("abcd")).unwrap();
        let b = hasher.hash(WORDS, &"abcd".to_string()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unequal_objects_hash_differently() {
        let hasher = ObjectHasher::default();
        let a = hasher.hash(WORDS, &vec![1u32, 2, 3]).unwrap();
        let b = hasher.hash(WORDS, &vec![1u32, 2, 4]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_matches_hash_of_encoded_bytes() {
        let hasher = ObjectHasher::new(Codec::Json);
        let tag = TypeTag::new(Kind::TargetVector, "target");
        let (bytes, hash) = hasher.encode_and_hash(tag, &vec![1.5f64, 2.5]).unwrap();
        assert_eq!(hasher.hash_bytes(Kind::TargetVector, &bytes), hash);
        assert_eq!(hasher.hash(tag, &vec![1.5f64, 2.5]).unwrap(), hash);
    }

    #[test]
    fn codec_changes_the_hash() {
        let text = String::from("x");
        let bin = ObjectHasher::new(Codec::Bincode).hash(WORDS, &text).unwrap();
        let json = ObjectHasher::new(Codec::Json).hash(WORDS, &text).unwrap();
        assert_ne!(bin, json);
    }

    #[test]
    fn same_layout_types_hash_differently() {
        for codec in [Codec::Bincode, Codec::Json] {
            let hasher = ObjectHasher::new(codec);
            let ridge = hasher.hash(RIDGE, &Ridge { alpha: 1.0 }).unwrap();
            let mean = hasher.hash(MEAN, &Mean { mean: 1.0 }).unwrap();
            assert_ne!(ridge, mean, "{codec}");
        }
    }

    #[test]
    fn decoding_as_another_type_is_rejected() {
        for codec in [Codec::Bincode, Codec::Json] {
            let hasher = ObjectHasher::new(codec);
            let bytes = hasher.encode(RIDGE, &Ridge { alpha: 1.0 }).unwrap();
            assert_eq!(hasher.decode::<Ridge>(RIDGE, &bytes).unwrap(), Ridge { alpha: 1.0 });

            let err = hasher.decode::<Mean>(MEAN, &bytes).unwrap_err();
            match err {
                CodecError::TypeMismatch { expected, actual } => {
                    assert_eq!(expected, "mean");
                    assert_eq!(actual, "ridge");
                }
                other => panic!("unexpected error for {codec}: {other}"),
            }
        }
    }

    #[test]
    fn mismatch_is_reported_when_payload_does_not_decode() {
        let hasher = ObjectHasher::new(Codec::Json);
        let bytes = hasher.encode(WORDS, &vec!["a".to_string()]).unwrap();
        let err = hasher.decode::<Ridge>(RIDGE, &bytes).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn untagged_bytes_fail_to_decode() {
        let hasher = ObjectHasher::new(Codec::Json);
        let raw = Codec::Json.encode(&Ridge { alpha: 1.0 }).unwrap();
        assert!(hasher.decode::<Ridge>(RIDGE, &raw).is_err());
    }

    proptest! {
        #[test]
        fn hash_survives_decode_encode(words in proptest::collection::vec(".{0,12}", 0..16)) {
            let hasher = ObjectHasher::default();
            let bytes = hasher.encode(WORDS, &words).unwrap();
            let decoded: Vec<String> = hasher.decode(WORDS, &bytes).unwrap();
            prop_assert_eq!(
                hasher.hash(WORDS, &decoded).unwrap(),
                hasher.hash(WORDS, &words).unwrap()
            );
        }
    }
}
