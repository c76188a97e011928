#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Parses the provider's protocol string ("tcp"/"udp", any case).
    pub fn parse(input: &str) -> Option<Protocol> {
        if input.eq_ignore_ascii_case("tcp") {
            Some(Protocol::Tcp)
        } else if input.eq_ignore_ascii_case("udp") {
            Some(Protocol::Udp)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Lowercase is the provider's wire form
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}
