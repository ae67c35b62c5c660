use super::codec::{Reader, Writer};
use super::location::{LocAction, Location};
use crate::error;
use crate::lang::Error;
use crc::crc32;
use log::debug;

type Result<T> = std::result::Result<T, Error>;

pub const GAME_MAGIC: &[u8; 4] = b"FBLG";

/// Legacy files carry a fixed action table per location; slots with an
/// empty name are unused.
pub const LEGACY_ACTION_SLOTS: usize = 20;

/// On-disk generation of a game file, declared by the tag byte after the
/// magic. Never sniffed from content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameFormat {
    Legacy,
    Current,
}

impl GameFormat {
    fn tag(self) -> u8 {
        match self {
            GameFormat::Legacy => 1,
            GameFormat::Current => 2,
        }
    }

    fn from_tag(tag: u8) -> Result<GameFormat> {
        match tag {
            1 => Ok(GameFormat::Legacy),
            2 => Ok(GameFormat::Current),
            _ => Err(error!(CannotLoadFile; "UNKNOWN GAME FORMAT")),
        }
    }
}

/// A parsed game file: the static world plus its identity checksum, which
/// save files embed to refuse restoring against the wrong game.
#[derive(Debug)]
pub struct GameFile {
    pub version: String,
    pub crc: u32,
    pub locations: Vec<Location>,
}

impl GameFile {
    pub fn parse(bytes: &[u8]) -> Result<GameFile> {
        let mut r = Reader::new(bytes);
        if r.get_raw(4)? != GAME_MAGIC {
            return Err(error!(CannotLoadFile; "NOT A GAME FILE"));
        }
        let format = GameFormat::from_tag(r.get_u8()?)?;
        let version = r.get_str()?;
        let declared_crc = r.get_u32()?;
        let body_crc = crc32::checksum_ieee(r.get_raw(r.remaining())?);
        if body_crc != declared_crc {
            return Err(error!(CannotLoadFile; "CHECKSUM MISMATCH"));
        }
        // re-read past the header now the body is known intact
        let mut r = Reader::new(bytes);
        r.get_raw(4)?;
        r.get_u8()?;
        r.get_str()?;
        r.get_u32()?;
        let count = r.get_count()?;
        let mut locations = Vec::with_capacity(count);
        for _ in 0..count {
            locations.push(GameFile::parse_location(&mut r, format)?);
        }
        debug!(
            "game file parsed: {} locations, version {}, crc {:08x}",
            locations.len(),
            version,
            body_crc
        );
        Ok(GameFile {
            version,
            crc: body_crc,
            locations,
        })
    }

    fn parse_location(r: &mut Reader, format: GameFormat) -> Result<Location> {
        let name = r.get_str()?;
        let desc = r.get_str()?;
        let code = GameFile::parse_lines(r)?;
        let slots = match format {
            GameFormat::Legacy => LEGACY_ACTION_SLOTS,
            GameFormat::Current => r.get_count()?,
        };
        let mut actions = vec![];
        for _ in 0..slots {
            let image = r.get_opt_str()?;
            let act_name = r.get_str()?;
            let act_code = GameFile::parse_lines(r)?;
            if act_name.is_empty() {
                continue; // unused legacy slot
            }
            actions.push(LocAction {
                image,
                name: act_name,
                code: act_code,
            });
        }
        Ok(Location {
            name,
            desc,
            code,
            actions,
        })
    }

    fn parse_lines(r: &mut Reader) -> Result<Vec<String>> {
        let count = r.get_count()?;
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            lines.push(r.get_str()?);
        }
        Ok(lines)
    }

    /// Serializes the world back out; used by game tooling and the test
    /// suite. The CRC field is computed over everything that follows it.
    pub fn write(version: &str, locations: &[Location], format: GameFormat) -> Vec<u8> {
        let mut body = Writer::new();
        body.put_u32(locations.len() as u32);
        for loc in locations {
            body.put_str(&loc.name);
            body.put_str(&loc.desc);
            GameFile::write_lines(&mut body, &loc.code);
            match format {
                GameFormat::Legacy => {
                    for n in 0..LEGACY_ACTION_SLOTS {
                        match loc.actions.get(n) {
                            Some(act) => GameFile::write_action(&mut body, act),
                            None => GameFile::write_action(&mut body, &LocAction::default()),
                        }
                    }
                }
                GameFormat::Current => {
                    body.put_u32(loc.actions.len() as u32);
                    for act in &loc.actions {
                        GameFile::write_action(&mut body, act);
                    }
                }
            }
        }
        let body = body.into_bytes();
        let mut w = Writer::new();
        w.put_raw(GAME_MAGIC);
        w.put_u8(format.tag());
        w.put_str(version);
        w.put_u32(crc32::checksum_ieee(&body));
        w.put_raw(&body);
        w.into_bytes()
    }

    fn write_action(w: &mut Writer, act: &LocAction) {
        w.put_opt_str(&act.image);
        w.put_str(&act.name);
        GameFile::write_lines(w, &act.code);
    }

    fn write_lines(w: &mut Writer, lines: &[String]) {
        w.put_u32(lines.len() as u32);
        for line in lines {
            w.put_str(line);
        }
    }
}
