//! Row rendering: turns payload rows into styled table cells.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::format::{
    fmt_change, fmt_money, fmt_name, fmt_number, fmt_percent, fmt_price, fmt_text,
};
use crate::model::Row;

pub const COINGECKO_COIN_BASE: &str = "https://www.coingecko.com/en/coins/";
pub const CRYPTORANK_ICO_BASE: &str = "https://cryptorank.io/ico/";

/// How a column's value is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Index,
    Name,
    Price,
    Money,
    Number,
    Percent,
    Change,
    Text,
}

/// Display columns, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Index,
    CoinName,
    Price,
    Pct24h,
    Pct7d,
    CurrentSupply,
    CurrentMarketCap,
    TotalSupply,
    TotalMarketCap,
    FoundRaises,
    InvestorPercentage,
    FinancingValuation,
    FinancingBasedPrice,
    AnnualizedIncome,
    IncomeValuation,
    IncomeBasedPrice,
    Tokenomics,
    Vesting,
    Cexs,
    Tags,
}

impl Column {
    pub const ALL: [Column; 20] = [
        Column::Index,
        Column::CoinName,
        Column::Price,
        Column::Pct24h,
        Column::Pct7d,
        Column::CurrentSupply,
        Column::CurrentMarketCap,
        Column::TotalSupply,
        Column::TotalMarketCap,
        Column::FoundRaises,
        Column::InvestorPercentage,
        Column::FinancingValuation,
        Column::FinancingBasedPrice,
        Column::AnnualizedIncome,
        Column::IncomeValuation,
        Column::IncomeBasedPrice,
        Column::Tokenomics,
        Column::Vesting,
        Column::Cexs,
        Column::Tags,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Column::Index => "#",
            Column::CoinName => "Token",
            Column::Price => "Price",
            Column::Pct24h => "24h",
            Column::Pct7d => "7d",
            Column::CurrentSupply => "Circulating Supply",
            Column::CurrentMarketCap => "Market Cap",
            Column::TotalSupply => "Total Supply",
            Column::TotalMarketCap => "FDV",
            Column::FoundRaises => "Funds Raised",
            Column::InvestorPercentage => "Investor %",
            Column::FinancingValuation => "Financing Valuation",
            Column::FinancingBasedPrice => "Financing-based Price",
            Column::AnnualizedIncome => "Annualized Income",
            Column::IncomeValuation => "Income Valuation",
            Column::IncomeBasedPrice => "Income-based Price",
            Column::Tokenomics => "Tokenomics",
            Column::Vesting => "Vesting",
            Column::Cexs => "CEXs",
            Column::Tags => "Tags",
        }
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Column::Index => CellKind::Index,
            Column::CoinName => CellKind::Name,
            Column::Price => CellKind::Price,
            Column::Pct24h | Column::Pct7d => CellKind::Change,
            Column::CurrentSupply | Column::TotalSupply => CellKind::Number,
            Column::InvestorPercentage => CellKind::Percent,
            Column::Tokenomics | Column::Vesting | Column::Cexs | Column::Tags => CellKind::Text,
            Column::CurrentMarketCap
            | Column::TotalMarketCap
            | Column::FoundRaises
            | Column::FinancingValuation
            | Column::FinancingBasedPrice
            | Column::AnnualizedIncome
            | Column::IncomeValuation
            | Column::IncomeBasedPrice => CellKind::Money,
        }
    }

    fn highlighted(&self) -> bool {
        matches!(
            self,
            Column::Price | Column::FinancingBasedPrice | Column::IncomeBasedPrice
        )
    }

    fn numeric(&self, row: &Row) -> Option<f64> {
        match self {
            Column::Price => row.price,
            Column::Pct24h => row.pct_24h,
            Column::Pct7d => row.pct_7d,
            Column::CurrentSupply => row.current_supply,
            Column::CurrentMarketCap => row.current_market_cap,
            Column::TotalSupply => row.total_supply,
            Column::TotalMarketCap => row.total_market_cap,
            Column::FoundRaises => row.found_raises,
            Column::InvestorPercentage => row.investor_percentage,
            Column::FinancingValuation => row.financing_valuation,
            Column::FinancingBasedPrice => row.financing_based_price,
            Column::AnnualizedIncome => row.annualized_income,
            Column::IncomeValuation => row.income_valuation,
            Column::IncomeBasedPrice => row.income_based_price,
            _ => None,
        }
    }

    fn text<'a>(&self, row: &'a Row) -> Option<&'a str> {
        match self {
            Column::CoinName => row.coin_name.as_deref(),
            Column::Tokenomics => row.tokenomics.as_deref(),
            Column::Vesting => row.vesting.as_deref(),
            Column::Cexs => row.cexs.as_deref(),
            Column::Tags => row.tags.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub highlight: bool,
    /// Model price above the market price: rendered bold red.
    pub overvalued: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub column: Column,
    pub text: String,
    /// External link, opened in a new browsing context.
    pub href: Option<String>,
    pub style: CellStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    /// 1-based display position.
    pub index: usize,
    pub coin_id: Option<String>,
    pub cells: Vec<Cell>,
}

impl RenderedRow {
    pub fn cell(&self, column: Column) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column == column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Lookup links on name and funds-raised cells.
    pub links: bool,
    /// Price highlighting and the overvalued flag.
    pub highlight: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            links: true,
            highlight: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render rows in input order, numbering them from 1.
    pub fn render(&self, rows: &[Row]) -> Vec<RenderedRow> {
        rows.iter()
            .enumerate()
            .map(|(idx, row)| self.render_row(idx + 1, row))
            .collect()
    }

    pub fn render_row(&self, index: usize, row: &Row) -> RenderedRow {
        let cells = Column::ALL
            .iter()
            .map(|column| self.render_cell(*column, index, row))
            .collect();
        RenderedRow {
            index,
            coin_id: row.coin_id.clone(),
            cells,
        }
    }

    fn render_cell(&self, column: Column, index: usize, row: &Row) -> Cell {
        let value = column.numeric(row);
        let text = match column.kind() {
            CellKind::Index => index.to_string(),
            CellKind::Name => fmt_name(column.text(row)),
            CellKind::Price => fmt_price(value),
            CellKind::Money => fmt_money(value),
            CellKind::Number => fmt_number(value),
            CellKind::Percent => fmt_percent(value),
            CellKind::Change => fmt_change(value),
            CellKind::Text => fmt_text(column.text(row)),
        };

        let href = if self.options.links {
            lookup_link(column, row.coin_id.as_deref())
        } else {
            None
        };

        let style = if self.options.highlight {
            CellStyle {
                highlight: column.highlighted(),
                overvalued: matches!(
                    column,
                    Column::FinancingBasedPrice | Column::IncomeBasedPrice
                ) && is_overvalued(value, row.price),
            }
        } else {
            CellStyle::default()
        };

        Cell {
            column,
            text,
            href,
            style,
        }
    }
}

/// True when both prices are known and the model price exceeds the market.
pub fn is_overvalued(model_price: Option<f64>, price: Option<f64>) -> bool {
    match (model_price, price) {
        (Some(model), Some(market)) if model.is_finite() && market.is_finite() => model > market,
        _ => false,
    }
}

fn lookup_link(column: Column, coin_id: Option<&str>) -> Option<String> {
    let base = match column {
        Column::CoinName => COINGECKO_COIN_BASE,
        Column::FoundRaises => CRYPTORANK_ICO_BASE,
        _ => return None,
    };
    let id = coin_id.filter(|id| !id.is_empty())?;
    lookup_url(base, id).ok()
}

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, the same set
/// `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Append `id` to `base` as a single percent-encoded path segment.
pub fn lookup_url(base: &str, id: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(base)?;
    if url.cannot_be_a_base() {
        anyhow::bail!("base url cannot carry a path: {}", base);
    }
    let segment = utf8_percent_encode(id, COMPONENT).to_string();
    let path = format!("{}/{}", url.path().trim_end_matches('/'), segment);
    url.set_path(&path);
    Ok(url.into())
}
