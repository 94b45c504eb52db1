// LOC chunk envelope
//
// Wire layout of one unit (all integers are varints, see `crate::varint`):
//
// +-----------+-----------+-------+-----------+----------+-----------------+
// | MediaType | ChunkType | SeqId | Timestamp | Duration | FirstFrameClkms |
// +-----------+-----------+-------+-----------+----------+-----------------+
// | MetaDataLength | MetaData (MetaDataLength bytes) | Data (rest of unit)  |
// +----------------+---------------------------------+----------------------+
//
// Data has no length prefix: it is whatever remains of the unit, so the
// transport must hand the decoder exactly one unit per call.

pub mod define;
pub mod errors;

use {
    self::{
        define::{ChunkType, MediaType},
        errors::{DecodeError, EncodeError},
    },
    crate::{
        bytesio::{bytes_reader::BytesReader, bytes_writer::BytesWriter},
        varint::{read_varint, varint_len, write_varint},
    },
    base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _},
    bytes::Bytes,
    rand::Rng,
    std::fmt,
};

const PROCESS_LOCAL_ID_SPACE: u64 = 100_000;

#[derive(Debug, Clone)]
pub struct ChunkEnvelope {
    pub media_type: MediaType,
    pub chunk_type: ChunkType,
    pub seq_id: u64,
    pub timestamp: u64,
    pub duration: u64,
    pub first_frame_clkms: u64,
    pub metadata: Bytes,
    pub data: Bytes,
    /// Correlation id for logs inside this process. Never on the wire.
    process_local_id: String,
}

fn generate_process_local_id(
    media_type: MediaType,
    timestamp: u64,
    chunk_type: ChunkType,
    seq_id: u64,
) -> String {
    let salt = rand::thread_rng().gen_range(0..PROCESS_LOCAL_ID_SPACE);
    STANDARD_NO_PAD.encode(format!("{media_type}-{timestamp}-{chunk_type}-{seq_id}-{salt}"))
}

fn write_field(writer: &mut BytesWriter, field: &'static str, value: u64) -> Result<(), EncodeError> {
    write_varint(writer, value).map_err(|e| EncodeError::field(field, e))?;
    Ok(())
}

fn read_field(reader: &mut BytesReader, field: &'static str) -> Result<u64, DecodeError> {
    read_varint(reader).map_err(|e| DecodeError::field(field, e))
}

impl ChunkEnvelope {
    #[must_use]
    pub fn new(media_type: MediaType, chunk_type: ChunkType, seq_id: u64, timestamp: u64) -> Self {
        Self {
            media_type,
            chunk_type,
            seq_id,
            timestamp,
            duration: 0,
            first_frame_clkms: 0,
            metadata: Bytes::new(),
            data: Bytes::new(),
            process_local_id: generate_process_local_id(media_type, timestamp, chunk_type, seq_id),
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_first_frame_clkms(mut self, first_frame_clkms: u64) -> Self {
        self.first_frame_clkms = first_frame_clkms;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = metadata.into();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    #[must_use]
    pub fn process_local_id(&self) -> &str {
        &self.process_local_id
    }

    /// Size of the encoded unit.
    pub fn encoded_len(&self) -> Result<usize, EncodeError> {
        let fields = [
            ("mediaType", self.media_type.code()),
            ("chunkType", self.chunk_type.code()),
            ("seqId", self.seq_id),
            ("timestamp", self.timestamp),
            ("duration", self.duration),
            ("firstFrameClkms", self.first_frame_clkms),
            ("metaDataLength", self.metadata.len() as u64),
        ];

        let mut len = self.metadata.len() + self.data.len();
        for (field, value) in fields {
            len += varint_len(value).map_err(|e| EncodeError::field(field, e))?;
        }
        Ok(len)
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut writer = BytesWriter::with_capacity(self.encoded_len()?);

        write_field(&mut writer, "mediaType", self.media_type.code())?;
        write_field(&mut writer, "chunkType", self.chunk_type.code())?;
        write_field(&mut writer, "seqId", self.seq_id)?;
        write_field(&mut writer, "timestamp", self.timestamp)?;
        write_field(&mut writer, "duration", self.duration)?;
        write_field(&mut writer, "firstFrameClkms", self.first_frame_clkms)?;
        write_field(&mut writer, "metaDataLength", self.metadata.len() as u64)?;
        writer.write(&self.metadata)?;
        writer.write(&self.data)?;

        Ok(Bytes::from(writer.bytes))
    }

    /// Decode exactly one unit. Everything after the metadata becomes `data`.
    pub fn decode(unit: Bytes) -> Result<Self, DecodeError> {
        let mut reader = BytesReader::from_bytes(unit);

        let media_type = MediaType::try_from(read_field(&mut reader, "mediaType")?)?;
        let chunk_type = ChunkType::try_from(read_field(&mut reader, "chunkType")?)?;
        let seq_id = read_field(&mut reader, "seqId")?;
        let timestamp = read_field(&mut reader, "timestamp")?;
        let duration = read_field(&mut reader, "duration")?;
        let first_frame_clkms = read_field(&mut reader, "firstFrameClkms")?;

        let declared = read_field(&mut reader, "metaDataLength")?;
        let available = reader.len();
        let metadata = usize::try_from(declared)
            .ok()
            .and_then(|len| reader.read_bytes(len).ok())
            .ok_or(DecodeError::ShortMetaData {
                declared,
                available,
            })?
            .freeze();

        let data = reader.extract_remaining_bytes().freeze();

        Ok(Self {
            media_type,
            chunk_type,
            seq_id,
            timestamp,
            duration,
            first_frame_clkms,
            metadata,
            data,
            process_local_id: generate_process_local_id(media_type, timestamp, chunk_type, seq_id),
        })
    }
}

/// Wire fields only; `process_local_id` is regenerated on every decode.
impl PartialEq for ChunkEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.media_type == other.media_type
            && self.chunk_type == other.chunk_type
            && self.seq_id == other.seq_id
            && self.timestamp == other.timestamp
            && self.duration == other.duration
            && self.first_frame_clkms == other.first_frame_clkms
            && self.metadata == other.metadata
            && self.data == other.data
    }
}

impl Eq for ChunkEnvelope {}

impl fmt::Display for ChunkEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LocPackage[{}] media_type={} chunk_type={} seq_id={} timestamp={} duration={} first_frame_clkms={} metadata={}B data={}B",
            self.process_local_id,
            self.media_type,
            self.chunk_type,
            self.seq_id,
            self.timestamp,
            self.duration,
            self.first_frame_clkms,
            self.metadata.len(),
            self.data.len(),
        )
    }
}
