pub(super) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS prices (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol      TEXT    NOT NULL,
    date        TEXT    NOT NULL,
    open        REAL    NOT NULL,
    high        REAL    NOT NULL,
    low         REAL    NOT NULL,
    close       REAL    NOT NULL CHECK (close > 0),
    volume      INTEGER NOT NULL CHECK (volume >= 0),
    is_stale    INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT    NOT NULL,
    UNIQUE (symbol, date)
);

CREATE TABLE IF NOT EXISTS signals (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol      TEXT    NOT NULL,
    ts          TEXT    NOT NULL,
    signal      TEXT    NOT NULL CHECK (signal IN ('buy', 'sell', 'hold')),
    rsi         REAL,
    sma20       REAL,
    sma50       REAL,
    close       REAL    NOT NULL,
    is_stale    INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT    NOT NULL,
    UNIQUE (symbol, ts)
);

CREATE INDEX IF NOT EXISTS idx_signals_ts ON signals (ts DESC);
CREATE INDEX IF NOT EXISTS idx_prices_symbol_date ON prices (symbol, date);
"#;
