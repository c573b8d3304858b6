//! The topology JSON schema (component J's input contract, §6). Parsing the
//! file itself is the CLI's job; these are the structs `serde_json`
//! deserializes into, and what the engine's topology builder consumes.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyRecord {
    pub module: String,
    pub messagerate: Option<String>,
    pub bandwidth: Option<String>,
    pub propagationdelay: Option<String>,
    pub probframecorrupt: Option<u8>,
    pub probframeloss: Option<u8>,
    #[serde(default)]
    pub hosts: Vec<HostRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostRecord {
    pub name: Option<String>,
    pub messagerate: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRecord {
    pub to: String,
    pub bandwidth: Option<String>,
    pub propagationdelay: Option<String>,
    pub probframecorrupt: Option<u8>,
    pub probframeloss: Option<u8>,
}
