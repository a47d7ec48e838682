use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A decoded `data:<mime>;base64,<payload>` string, or a bare base64 payload
/// (which has no MIME type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn decode(input: &str) -> Result<DataPayload, base64::DecodeError> {
    let input = input.trim();
    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((header, payload)) => {
                let mime = header.split(';').next().unwrap_or_default();
                let mime = (!mime.is_empty()).then(|| mime.to_string());
                (mime, payload)
            }
            None => (None, rest),
        },
        None => (None, input),
    };

    Ok(DataPayload {
        mime,
        bytes: STANDARD.decode(payload)?,
    })
}

/// File extension for a MIME type: the subtype with any parameters or
/// structured-syntax suffix dropped (`audio/webm;codecs=opus` -> `webm`).
///
/// Only lowercase ASCII letters and digits make it into a file name; any
/// other subtype yields `None`.
pub fn extension_for(mime: &str) -> Option<&str> {
    let subtype = mime.split_once('/')?.1;
    let subtype = subtype.split(';').next()?.trim();
    let subtype = subtype.split('+').next()?;
    match subtype {
        "jpeg" => Some("jpg"),
        other if is_plain_extension(other) => Some(other),
        _ => None,
    }
}

fn is_plain_extension(ext: &str) -> bool {
    !ext.is_empty()
        && ext
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_and_bare_base64_decode_alike() {
        let uri = encode("image/png", b"pixels");
        assert!(uri.starts_with("data:image/png;base64,"));

        let decoded = decode(&uri).unwrap();
        assert_eq!(decoded.mime.as_deref(), Some("image/png"));
        assert_eq!(decoded.bytes, b"pixels");

        let bare = decode(uri.split_once(',').unwrap().1).unwrap();
        assert_eq!(bare.mime, None);
        assert_eq!(bare.bytes, b"pixels");
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert!(decode("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn extensions_follow_subtype() {
        assert_eq!(extension_for("audio/webm;codecs=opus"), Some("webm"));
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/svg+xml"), Some("svg"));
        assert_eq!(extension_for("nonsense"), None);
        assert_eq!(extension_for("image/mp4"), Some("mp4"));
    }

    #[test]
    fn path_like_subtypes_have_no_extension() {
        assert_eq!(extension_for("image/../../evil"), None);
        assert_eq!(extension_for("image/x\\y"), None);
        assert_eq!(extension_for("image/png.exe"), None);
        assert_eq!(extension_for("image/PNG"), None);
        assert_eq!(extension_for("image/"), None);
    }
}
