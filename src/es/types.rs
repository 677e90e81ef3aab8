use std::fmt;

/// Identifier of the service owning a set; a plain value, never a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ServiceId(pub u32);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service#{}", self.0)
    }
}

/// Broad category of a component; decides which metadata is meaningful and
/// the default presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentClass {
    Video,
    Audio,
    Subtitle,
    Teletext,
    Data,
    /// CA and application-information signalling.
    Signaling,
    Other,
}

impl ComponentClass {
    pub const ALL: [ComponentClass; 7] = [
        ComponentClass::Video,
        ComponentClass::Audio,
        ComponentClass::Subtitle,
        ComponentClass::Teletext,
        ComponentClass::Data,
        ComponentClass::Signaling,
        ComponentClass::Other,
    ];

    /// Position in the default presentation order.
    pub fn rank(self) -> u8 {
        match self {
            ComponentClass::Video => 0,
            ComponentClass::Audio => 1,
            ComponentClass::Subtitle => 2,
            ComponentClass::Teletext => 3,
            ComponentClass::Data => 4,
            ComponentClass::Signaling => 5,
            ComponentClass::Other => 6,
        }
    }

    /// Classes whose order honours language preference.
    pub fn is_language_sensitive(self) -> bool {
        matches!(
            self,
            ComponentClass::Audio | ComponentClass::Subtitle | ComponentClass::Teletext
        )
    }
}

/// Component type of one elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Mpeg2Video,
    Mpeg4Video,
    H264,
    Hevc,
    Mpeg2Audio,
    Aac,
    AacLatm,
    Ac3,
    Eac3,
    /// DVB bitmap subtitles.
    DvbSub,
    /// Subtitles extracted from a teletext page.
    TextSub,
    Teletext,
    Data,
    Ca,
    /// HbbTV application information (AIT carrier).
    Hbbtv,
    Other,
}

impl ComponentType {
    pub fn class(self) -> ComponentClass {
        match self {
            ComponentType::Mpeg2Video
            | ComponentType::Mpeg4Video
            | ComponentType::H264
            | ComponentType::Hevc => ComponentClass::Video,
            ComponentType::Mpeg2Audio
            | ComponentType::Aac
            | ComponentType::AacLatm
            | ComponentType::Ac3
            | ComponentType::Eac3 => ComponentClass::Audio,
            ComponentType::DvbSub | ComponentType::TextSub => ComponentClass::Subtitle,
            ComponentType::Teletext => ComponentClass::Teletext,
            ComponentType::Data => ComponentClass::Data,
            ComponentType::Ca | ComponentType::Hbbtv => ComponentClass::Signaling,
            ComponentType::Other => ComponentClass::Other,
        }
    }

    pub fn is_video(self) -> bool {
        self.class() == ComponentClass::Video
    }

    pub fn is_audio(self) -> bool {
        self.class() == ComponentClass::Audio
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Mpeg2Video => "MPEG2VIDEO",
            ComponentType::Mpeg4Video => "MPEG4VIDEO",
            ComponentType::H264 => "H264",
            ComponentType::Hevc => "HEVC",
            ComponentType::Mpeg2Audio => "MPEG2AUDIO",
            ComponentType::Aac => "AAC",
            ComponentType::AacLatm => "AAC-LATM",
            ComponentType::Ac3 => "AC3",
            ComponentType::Eac3 => "EAC3",
            ComponentType::DvbSub => "DVBSUB",
            ComponentType::TextSub => "TEXTSUB",
            ComponentType::Teletext => "TELETEXT",
            ComponentType::Data => "DATA",
            ComponentType::Ca => "CA",
            ComponentType::Hbbtv => "HBBTV",
            ComponentType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conditional-access system applicable to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaId {
    pub caid: u16,
    pub provider_id: u32,
    /// PID carrying the ECMs, 0 when unknown.
    pub pid: u16,
}

impl CaId {
    pub fn new(caid: u16, pid: u16) -> Self {
        Self {
            caid,
            provider_id: 0,
            pid,
        }
    }
}
