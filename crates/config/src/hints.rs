#[derive(Debug)]
pub struct ConfigHint {
    pub key: &'static str,
    pub description: &'static str,
}

pub const CONFIG_HINTS: &[ConfigHint] = &[
    ConfigHint {
        key: "remote.api_url",
        description: "Base URL of the storefront backend, e.g. https://shop.example.com.",
    },
    ConfigHint {
        key: "remote.timeout_ms",
        description: "Per-request timeout in milliseconds. Does not apply to the stock stream.",
    },
    ConfigHint {
        key: "catalog.batch_size",
        description: "Number of products delivered per page, any positive integer.",
    },
    ConfigHint {
        key: "stock.reconnect_initial_ms",
        description: "First delay before reopening a dropped stock stream, in milliseconds.",
    },
    ConfigHint {
        key: "stock.reconnect_max_ms",
        description: "Upper bound for the doubling reconnect delay, in milliseconds.",
    },
    ConfigHint {
        key: "stock.notice_capacity",
        description: "Stock notices buffered per receiver before slow receivers start lagging.",
    },
    ConfigHint {
        key: "cart.undo_window_ms",
        description: "How long a removed cart line can be restored, in milliseconds.",
    },
    ConfigHint {
        key: "cart.notice_capacity",
        description: "Cart failure notices buffered per receiver before slow receivers start lagging.",
    },
];
