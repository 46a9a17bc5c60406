use {
    derive_more::{Display, From},
    enum_primitive_derive::Primitive,
    num_traits::FromPrimitive,
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        net::{IpAddr, SocketAddr},
    },
};

/// The three A2S query commands.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum QueryKind {
    #[display(fmt = "A2S_INFO")]
    Info,
    #[display(fmt = "A2S_PLAYER")]
    Player,
    #[display(fmt = "A2S_RULES")]
    Rules,
}

impl QueryKind {
    /// Command byte sent in the request.
    pub fn request_code(self) -> u8 {
        match self {
            QueryKind::Info => b'T',
            QueryKind::Player => b'U',
            QueryKind::Rules => b'V',
        }
    }

    /// Player and rules queries must echo a server-issued challenge.
    pub fn needs_challenge(self) -> bool {
        self != QueryKind::Info
    }
}

/// Opaque 4-byte token issued by the server and echoed back verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, From)]
pub struct Challenge(pub [u8; 4]);

impl Challenge {
    /// Reserved value that asks the server to issue a fresh challenge.
    pub const REQUEST: Challenge = Challenge([0xFF; 4]);

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl Default for Challenge {
    fn default() -> Self {
        Challenge::REQUEST
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Primitive, Serialize, Deserialize)]
pub enum ServerType {
    #[display(fmt = "Dedicated")]
    Dedicated = 0x64,
    #[display(fmt = "Non-Dedicated")]
    NonDedicated = 0x6c,
    #[display(fmt = "SourceTV")]
    SourceTV = 0x70,
}

impl ServerType {
    /// Unrecognized codes are reported as SourceTV.
    pub fn from_code(c: u8) -> Self {
        ServerType::from_u8(c).unwrap_or(ServerType::SourceTV)
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Primitive, Serialize, Deserialize)]
pub enum Os {
    #[display(fmt = "Windows")]
    Windows = 0x77,
    #[display(fmt = "Linux")]
    Linux = 0x6c,
    #[display(fmt = "Mac")]
    Mac = 0x6d,
}

impl Os {
    /// Unrecognized codes are reported as Mac.
    pub fn from_code(c: u8) -> Self {
        Os::from_u8(c).unwrap_or(Os::Mac)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub online: bool,
    pub address: IpAddr,
    pub port: u16,
    pub name: String,
    pub map: String,
    pub game: String,
    pub description: String,
    pub app_id: u16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: ServerType,
    pub os: Os,
    pub password_required: bool,
    pub vac_secure: bool,
}

impl ServerInfo {
    pub fn new(addr: SocketAddr) -> ServerInfo {
        ServerInfo {
            online: true,
            address: addr.ip(),
            port: addr.port(),
            name: Default::default(),
            map: Default::default(),
            game: Default::default(),
            description: Default::default(),
            app_id: Default::default(),
            players: Default::default(),
            max_players: Default::default(),
            bots: Default::default(),
            server_type: ServerType::SourceTV,
            os: Os::Mac,
            password_required: Default::default(),
            vac_secure: Default::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Index as reported by the server, not the position in the list.
    pub index: u8,
    pub name: String,
    pub score: i32,
    /// Seconds connected.
    pub duration: f32,
}

pub type Rules = BTreeMap<String, String>;
