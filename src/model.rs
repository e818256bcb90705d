//! Descriptor model shared by the transformation and generation passes

use std::fmt;
use std::str::FromStr;

/// Exact name + descriptor of a method. No overload resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodSignature<'a> {
    pub name: &'a str,
    pub descriptor: &'a str,
}

impl<'a> MethodSignature<'a> {
    pub const fn new(name: &'a str, descriptor: &'a str) -> Self {
        Self { name, descriptor }
    }

    pub fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name == name && self.descriptor == descriptor
    }
}

impl fmt::Display for MethodSignature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor)
    }
}

/// A recognized annotation type; only its presence matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationMarker(pub &'static str);

impl AnnotationMarker {
    pub fn descriptor(self) -> &'static str {
        self.0
    }

    pub fn matches(self, descriptor: &str) -> bool {
        self.0 == descriptor
    }
}

/// What the registrar generator needs to know about a subscriber class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberMetadata {
    /// Internal name of the subscriber class.
    pub class_name: String,
    pub instance_subscribers: bool,
    pub static_subscribers: bool,
    pub interface: bool,
}

impl SubscriberMetadata {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            instance_subscribers: false,
            static_subscribers: false,
            interface: false,
        }
    }

    pub fn with_instance_subscribers(mut self) -> Self {
        self.instance_subscribers = true;
        self
    }

    pub fn with_static_subscribers(mut self) -> Self {
        self.static_subscribers = true;
        self
    }

    pub fn as_interface(mut self) -> Self {
        self.interface = true;
        self
    }
}

/// Event bus a subscriber annotation registers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bus {
    #[default]
    Forge,
    Mod,
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bus::Forge => "FORGE",
            Bus::Mod => "MOD",
        })
    }
}

impl FromStr for Bus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forge" => Ok(Bus::Forge),
            "mod" => Ok(Bus::Mod),
            other => Err(format!("unknown event bus '{}', expected 'forge' or 'mod'", other)),
        }
    }
}

/// Payload of an `@EventBusSubscriber` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberAnnotation {
    pub bus: Bus,
    pub client: bool,
    pub server: bool,
    /// Recorded, not enforced.
    pub target_mod_id: Option<String>,
}

impl Default for SubscriberAnnotation {
    fn default() -> Self {
        Self { bus: Bus::Forge, client: true, server: true, target_mod_id: None }
    }
}

impl SubscriberAnnotation {
    pub fn new(bus: Bus) -> Self {
        Self { bus, ..Self::default() }
    }

    /// Build a payload from side switches. Setting neither switch applies
    /// to both sides.
    pub fn from_flags(bus: Bus, client: bool, server: bool, target_mod_id: Option<String>) -> Self {
        let both = !client && !server;
        Self { bus, client: client || both, server: server || both, target_mod_id }
    }

    pub fn client_only(mut self) -> Self {
        self.client = true;
        self.server = false;
        self
    }

    pub fn server_only(mut self) -> Self {
        self.client = false;
        self.server = true;
        self
    }

    pub fn with_target_mod_id(mut self, mod_id: impl Into<String>) -> Self {
        self.target_mod_id = Some(mod_id.into());
        self
    }

    /// Whether registration is restricted to fewer than both sides.
    pub fn is_sided(&self) -> bool {
        !(self.client && self.server)
    }
}

impl fmt::Display for SubscriberAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBusSubscriber(bus={}, client={}, server={}", self.bus, self.client, self.server)?;
        if let Some(mod_id) = &self.target_mod_id {
            write!(f, ", modid={}", mod_id)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_payload_applies_to_both_sides() {
        let payload = SubscriberAnnotation::default();
        assert_eq!(payload.bus, Bus::Forge);
        assert!(!payload.is_sided());
        assert!(payload.clone().client_only().is_sided());
        assert_eq!(payload.to_string(), "EventBusSubscriber(bus=FORGE, client=true, server=true)");
    }

    #[test]
    fn side_switches_map_to_payload() {
        let both = SubscriberAnnotation::from_flags(Bus::Mod, false, false, None);
        assert_eq!(both, SubscriberAnnotation::new(Bus::Mod));
        assert!(!both.is_sided());

        let client = SubscriberAnnotation::from_flags(Bus::Forge, true, false, Some("examplemod".to_string()));
        assert_eq!(client, SubscriberAnnotation::default().client_only().with_target_mod_id("examplemod"));

        let server = SubscriberAnnotation::from_flags(Bus::Forge, false, true, None);
        assert_eq!(server, SubscriberAnnotation::default().server_only());

        assert!(!SubscriberAnnotation::from_flags(Bus::Forge, true, true, None).is_sided());
    }

    #[test]
    fn bus_parses_case_insensitively() {
        assert_eq!("MOD".parse::<Bus>(), Ok(Bus::Mod));
        assert!("fabric".parse::<Bus>().is_err());
    }
}
