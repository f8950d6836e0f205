use anyhow::Context;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
        }
    }

    /// Map a pack entry type code (1-4) to its object type
    pub fn from_pack_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ObjectType::Commit),
            2 => Some(ObjectType::Tree),
            3 => Some(ObjectType::Blob),
            4 => Some(ObjectType::Tag),
            _ => None,
        }
    }

    /// Read the `<type> <size>\0` header of a loose object
    ///
    /// Returns the object type and the declared content size; the reader is left
    /// positioned at the first content byte.
    pub fn parse_object_header(data_reader: &mut impl BufRead) -> anyhow::Result<(Self, usize)> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;
        if object_type.pop() != Some(b' ') {
            anyhow::bail!("unexpected EOF in object type");
        }
        let object_type = ObjectType::try_from(std::str::from_utf8(&object_type)?)?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.pop() != Some(b'\0') {
            anyhow::bail!("unexpected EOF in object size");
        }
        let size = std::str::from_utf8(&size)?
            .parse::<usize>()
            .context("invalid object size")?;

        Ok((object_type, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            "tag" => Ok(ObjectType::Tag),
            _ => Err(anyhow::anyhow!("Invalid object type {value}")),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Read};

    #[test]
    fn header_is_consumed_up_to_the_content() {
        let mut reader = Cursor::new(b"blob 12\0hello world!".to_vec());

        let header = ObjectType::parse_object_header(&mut reader).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();

        assert_eq!(header, (ObjectType::Blob, 12));
        assert_eq!(content, "hello world!");
    }

    #[test]
    fn truncated_header_is_rejected() {
        let mut reader = Cursor::new(b"commit 12".to_vec());

        assert!(ObjectType::parse_object_header(&mut reader).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut reader = Cursor::new(b"note 1\0x".to_vec());

        assert!(ObjectType::parse_object_header(&mut reader).is_err());
    }
}
