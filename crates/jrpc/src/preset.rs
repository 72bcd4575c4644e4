//! Default connection settings for well-known JSON-RPC daemons.

use jrpc_core::ClientConfig;

// ==============================================================================
// Presets
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub hostname: &'static str,
    pub port: u16,
    pub ssl: bool,
    pub path: &'static str,
}

impl Preset {
    /// `bitcoind` and most daemons forked from it.
    pub const BITCOIN: Preset = Preset {
        name: "bitcoin",
        hostname: "127.0.0.1",
        port: 8332,
        ssl: false,
        path: "",
    };

    pub const LITECOIN: Preset = Preset {
        name: "litecoin",
        hostname: "127.0.0.1",
        port: 9332,
        ssl: false,
        path: "",
    };

    /// `monero-wallet-rpc`.
    pub const MONERO: Preset = Preset {
        name: "monero",
        hostname: "127.0.0.1",
        port: 18082,
        ssl: false,
        path: "/json_rpc",
    };

    /// Electrum (and Electrum-LTC) daemon RPC.
    pub const ELECTRUM: Preset = Preset {
        name: "electrum",
        hostname: "127.0.0.1",
        port: 7777,
        ssl: false,
        path: "",
    };

    pub const STEEM_ENGINE: Preset = Preset {
        name: "steem-engine",
        hostname: "api.steem-engine.com",
        port: 443,
        ssl: true,
        path: "/rpc/contracts",
    };

    pub const ALL: [Preset; 5] = [
        Self::BITCOIN,
        Self::LITECOIN,
        Self::MONERO,
        Self::ELECTRUM,
        Self::STEEM_ENGINE,
    ];

    pub fn by_name(name: &str) -> Option<Preset> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }

    /// A client configuration pre-filled with this preset. Adjust it with the
    /// `ClientConfig::with_*` methods before building a client.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.hostname, self.port)
            .with_ssl(self.ssl)
            .with_path(self.path)
    }
}
