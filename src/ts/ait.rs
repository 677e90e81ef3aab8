//! Application Information Table (ETSI TS 102 809), as signalled for HbbTV.

use super::parser::{parse_descriptors, TsParser};
use super::types::*;
use crate::error::{EsError, Result};
use url::Url;

/// Transport protocol id for HTTP delivery.
const PROTOCOL_HTTP: u16 = 0x0003;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    Autostart,
    Present,
    Destroy,
    Kill,
    Prefetch,
    Remote,
    Disabled,
    PlaybackAutostart,
    Other(u8),
}

impl From<u8> for ControlCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ControlCode::Autostart,
            0x02 => ControlCode::Present,
            0x03 => ControlCode::Destroy,
            0x04 => ControlCode::Kill,
            0x05 => ControlCode::Prefetch,
            0x06 => ControlCode::Remote,
            0x07 => ControlCode::Disabled,
            0x08 => ControlCode::PlaybackAutostart,
            other => ControlCode::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AitApplication {
    pub organisation_id: u32,
    pub application_id: u16,
    pub control_code: ControlCode,
    /// First name from the application name descriptor.
    pub name: Option<String>,
    pub url_base: Option<Url>,
    /// Initial path from the simple application location descriptor.
    pub location: Option<String>,
    pub descriptors: Vec<Descriptor>,
}

impl AitApplication {
    /// Entry point of an HTTP application: base joined with location.
    pub fn entry_url(&self) -> Option<Url> {
        let base = self.url_base.as_ref()?;
        match &self.location {
            Some(location) => base.join(location).ok(),
            None => Some(base.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ait {
    pub application_type: u16,
    pub test_application: bool,
    pub version: u8,
    pub common_descriptors: Vec<Descriptor>,
    pub applications: Vec<AitApplication>,
}

impl Ait {
    /// Parses one complete AIT section (CRC included).
    pub fn parse(parser: &TsParser, section: &[u8]) -> Result<Self> {
        let (header, data) = parser.checked_section(section)?;
        if header.table_id != TABLE_ID_AIT {
            return Err(EsError::Parser(format!(
                "table id 0x{:02x} is not an AIT",
                header.table_id
            )));
        }

        let mut pos = 0;
        let common_len = read_len12(data, pos)?;
        pos += 2;
        let common_descriptors = parse_descriptors(slice(data, pos, common_len)?)?;
        pos += common_len;

        let loop_len = read_len12(data, pos)?;
        pos += 2;
        let apps = slice(data, pos, loop_len)?;

        let mut applications = Vec::new();
        let mut p = 0;
        while p + 9 <= apps.len() {
            let organisation_id = u32::from_be_bytes([apps[p], apps[p + 1], apps[p + 2], apps[p + 3]]);
            let application_id = ((apps[p + 4] as u16) << 8) | apps[p + 5] as u16;
            let control_code = ControlCode::from(apps[p + 6]);
            let desc_len = read_len12(apps, p + 7)?;
            p += 9;
            let descriptors = parse_descriptors(slice(apps, p, desc_len)?)?;
            p += desc_len;

            let mut app = AitApplication {
                organisation_id,
                application_id,
                control_code,
                name: None,
                url_base: None,
                location: None,
                descriptors: Vec::new(),
            };
            for desc in &descriptors {
                match desc.tag {
                    AIT_DESC_APPLICATION_NAME if app.name.is_none() => {
                        app.name = application_name(&desc.data);
                    }
                    AIT_DESC_TRANSPORT_PROTOCOL if app.url_base.is_none() => {
                        app.url_base = http_url_base(&desc.data);
                    }
                    AIT_DESC_SIMPLE_APPLICATION_LOCATION => {
                        app.location = Some(dvb_text(&desc.data));
                    }
                    _ => {}
                }
            }
            app.descriptors = descriptors;
            applications.push(app);
        }

        Ok(Ait {
            application_type: header.table_id_extension & 0x7FFF,
            test_application: (header.table_id_extension & 0x8000) != 0,
            version: header.version,
            common_descriptors,
            applications,
        })
    }
}

fn read_len12(data: &[u8], pos: usize) -> Result<usize> {
    if pos + 2 > data.len() {
        return Err(EsError::InvalidData("AIT loop length missing".into()));
    }
    Ok(((data[pos] as usize & 0x0F) << 8) | data[pos + 1] as usize)
}

fn slice(data: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    data.get(pos..pos + len)
        .ok_or_else(|| EsError::InvalidData("AIT loop exceeds section".into()))
}

/// Decodes DVB text, dropping a leading character table selector.
fn dvb_text(data: &[u8]) -> String {
    let data = match data.first() {
        Some(&b) if b < 0x20 => &data[1..],
        _ => data,
    };
    String::from_utf8_lossy(data).into_owned()
}

fn application_name(data: &[u8]) -> Option<String> {
    // ISO_639_language_code(24) application_name_length(8) name
    let len = *data.get(3)? as usize;
    data.get(4..4 + len).map(dvb_text)
}

fn http_url_base(data: &[u8]) -> Option<Url> {
    if data.len() < 4 {
        return None;
    }
    let protocol_id = ((data[0] as u16) << 8) | data[1] as u16;
    if protocol_id != PROTOCOL_HTTP {
        return None;
    }
    let len = data[3] as usize;
    let base = data.get(4..4 + len)?;
    match Url::parse(&dvb_text(base)) {
        Ok(url) => Some(url),
        Err(e) => {
            log::debug!("AIT: ignoring malformed URL base: {}", e);
            None
        }
    }
}
