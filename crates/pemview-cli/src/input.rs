//! Reading command input from a file or stdin.

use std::fs;
use std::io::{self, Read};

/// Read all bytes from `file`, or stdin when `file` is `-`.
pub fn read_bytes(file: &str) -> io::Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(file)
    }
}

/// Read `file` as UTF-8 text.
pub fn read_text(file: &str) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = read_bytes(file)?;
    String::from_utf8(bytes).map_err(|_| format!("{file}: input is not valid UTF-8").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_text_file() {
        let tmp = std::env::temp_dir().join("test_pemview_input_text.pem");
        fs::write(&tmp, "hello\n").unwrap();
        assert_eq!(read_text(tmp.to_str().unwrap()).unwrap(), "hello\n");
        let _ = fs::remove_file(&tmp);
    }

    #[test]
    fn test_read_text_rejects_binary() {
        let tmp = std::env::temp_dir().join("test_pemview_input_binary.der");
        fs::write(&tmp, [0x30, 0x82, 0xFF, 0xFE]).unwrap();
        assert!(read_text(tmp.to_str().unwrap()).is_err());
        let _ = fs::remove_file(&tmp);
    }

    #[test]
    fn test_read_nonexistent_file() {
        assert!(read_bytes("/nonexistent_pemview_test/cert.pem").is_err());
    }
}
