use {
    super::errors::{DecodeError, ParseTagError},
    std::{fmt, str::FromStr},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Data,
    Audio,
    Video,
}

impl MediaType {
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Data => 0,
            Self::Audio => 1,
            Self::Video => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl TryFrom<u64> for MediaType {
    type Error = DecodeError;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Data),
            1 => Ok(Self::Audio),
            2 => Ok(Self::Video),
            other => Err(DecodeError::InvalidMediaType(other)),
        }
    }
}

impl FromStr for MediaType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Self::Data),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(ParseTagError::MediaType(other.to_string())),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkType {
    Delta,
    Key,
}

impl ChunkType {
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Delta => 0,
            Self::Key => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Key => "key",
        }
    }
}

impl TryFrom<u64> for ChunkType {
    type Error = DecodeError;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Delta),
            1 => Ok(Self::Key),
            other => Err(DecodeError::InvalidChunkType(other)),
        }
    }
}

impl FromStr for ChunkType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delta" => Ok(Self::Delta),
            "key" => Ok(Self::Key),
            other => Err(ParseTagError::ChunkType(other.to_string())),
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        for media_type in [MediaType::Data, MediaType::Audio, MediaType::Video] {
            assert_eq!(MediaType::try_from(media_type.code()).unwrap(), media_type);
            assert_eq!(media_type.as_str().parse::<MediaType>().unwrap(), media_type);
        }
        for chunk_type in [ChunkType::Delta, ChunkType::Key] {
            assert_eq!(ChunkType::try_from(chunk_type.code()).unwrap(), chunk_type);
            assert_eq!(chunk_type.as_str().parse::<ChunkType>().unwrap(), chunk_type);
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert!(matches!(
            MediaType::try_from(3),
            Err(DecodeError::InvalidMediaType(3))
        ));
        assert!(matches!(
            ChunkType::try_from(2),
            Err(DecodeError::InvalidChunkType(2))
        ));
        assert_eq!(
            "subtitle".parse::<MediaType>(),
            Err(ParseTagError::MediaType("subtitle".to_string()))
        );
        assert_eq!(
            "idr".parse::<ChunkType>().unwrap_err().to_string(),
            "invalid chunkType: idr"
        );
    }
}
