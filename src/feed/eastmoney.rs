//! Eastmoney quote API feed
//!
//! Uses the public push2 endpoints: `clist` for the instrument universe and
//! per-exchange directories, `kline` for forward-adjusted daily history, and
//! `slist` for concept-board membership. Responses use positional field ids
//! (f12 = code, f14 = name, ...) and mark missing values with `"-"`.

use std::collections::HashMap;

use crate::db::models::PriceBar;
use crate::error::{AppError, Result};
use crate::feed::{DirectoryEntry, Exchange, InstrumentListing, MarketFeed};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

const QUOTE_BASE: &str = "https://push2.eastmoney.com";
const HISTORY_BASE: &str = "https://push2his.eastmoney.com";

/// Rows requested per `clist` page
const PAGE_SIZE: usize = 500;

/// Screener filter covering every listed A-share on both exchanges
const FS_ALL_A_SHARES: &str = "m:0+t:6,m:0+t:80,m:1+t:2,m:1+t:23";
const FS_SHANGHAI: &str = "m:1+t:2,m:1+t:23";
const FS_SHENZHEN: &str = "m:0+t:6,m:0+t:80";

/// Eastmoney feed implementation
pub struct EastmoneyFeed {
    client: Client,
}

impl EastmoneyFeed {
    pub fn new() -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Accept", "application/json".parse().unwrap());
        headers.insert("Referer", "https://quote.eastmoney.com/".parse().unwrap());

        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .default_headers(headers)
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Security id used by the quote endpoints: market prefix + code
    fn secid(code: &str) -> String {
        if code.starts_with('6') {
            format!("1.{}", code)
        } else {
            format!("0.{}", code)
        }
    }

    /// Page through `clist` until the reported total is collected
    async fn fetch_clist_pages(&self, fs: &str, fields: &str) -> Result<Vec<ClistRow>> {
        let mut rows = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}/api/qt/clist/get?pn={}&pz={}&po=0&np=1&fltt=2&fs={}&fields={}",
                QUOTE_BASE, page, PAGE_SIZE, fs, fields
            );
            let response: ClistResponse = self.client.get(&url).send().await?.json().await?;

            let data = match response.data {
                Some(data) => data,
                None => break,
            };
            if data.diff.is_empty() {
                break;
            }

            let total = data.total as usize;
            rows.extend(data.diff);

            if rows.len() >= total {
                break;
            }
            page += 1;
        }

        Ok(rows)
    }
}

impl Default for EastmoneyFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketFeed for EastmoneyFeed {
    fn id(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch_instrument_list(&self) -> Result<Vec<InstrumentListing>> {
        let rows = self.fetch_clist_pages(FS_ALL_A_SHARES, "f12,f14").await?;

        let listings = rows
            .into_iter()
            .filter_map(|row| {
                let code = clean(row.code)?;
                let name = clean(row.name).unwrap_or_default();
                Some(InstrumentListing { code, name })
            })
            .collect();

        Ok(listings)
    }

    async fn fetch_exchange_directory(&self, exchange: Exchange) -> Result<Vec<DirectoryEntry>> {
        let fs = match exchange {
            Exchange::Shanghai => FS_SHANGHAI,
            Exchange::Shenzhen => FS_SHENZHEN,
        };
        let rows = self.fetch_clist_pages(fs, "f12,f14,f100,f102").await?;

        let entries = rows
            .into_iter()
            .filter_map(|row| {
                let code = clean(row.code)?;
                Some(DirectoryEntry {
                    code,
                    name: clean(row.name),
                    industry: clean(row.industry),
                    area: clean(row.area),
                })
            })
            .collect();

        Ok(entries)
    }

    async fn fetch_list_dates(&self) -> Result<HashMap<String, NaiveDate>> {
        let rows = self.fetch_clist_pages(FS_ALL_A_SHARES, "f12,f26").await?;

        let mut dates = HashMap::new();
        for row in rows {
            let code = match clean(row.code) {
                Some(code) => code,
                None => continue,
            };
            if let Some(date) = row.list_date.and_then(parse_compact_date) {
                dates.insert(code, date);
            }
        }

        Ok(dates)
    }

    async fn fetch_daily_prices(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        let url = format!(
            "{}/api/qt/stock/kline/get?secid={}&klt=101&fqt=1&beg={}&end={}\
             &fields1=f1,f2,f3,f4,f5,f6&fields2=f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61",
            HISTORY_BASE,
            Self::secid(code),
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        );
        let response: KlineResponse = self.client.get(&url).send().await?.json().await?;

        let klines = response.data.map(|data| data.klines).unwrap_or_default();

        let mut bars = Vec::with_capacity(klines.len());
        for line in &klines {
            bars.push(parse_kline(code, line)?);
        }

        Ok(bars)
    }

    async fn fetch_concepts(&self, code: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/api/qt/slist/get?spt=3&pn=1&pz=100&secid={}&fields=f14",
            QUOTE_BASE,
            Self::secid(code),
        );
        let response: ClistResponse = self.client.get(&url).send().await?.json().await?;

        let concepts = response
            .data
            .map(|data| data.diff)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| clean(row.name))
            .collect();

        Ok(concepts)
    }
}

#[derive(Debug, Deserialize)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Debug, Deserialize)]
struct ClistData {
    #[serde(default)]
    total: i64,
    #[serde(default)]
    diff: Vec<ClistRow>,
}

#[derive(Debug, Deserialize)]
struct ClistRow {
    #[serde(rename = "f12", default)]
    code: Option<String>,
    #[serde(rename = "f14", default)]
    name: Option<String>,
    #[serde(rename = "f100", default)]
    industry: Option<String>,
    #[serde(rename = "f102", default)]
    area: Option<String>,
    #[serde(rename = "f26", default)]
    list_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

/// The API marks missing strings with `"-"`
fn clean(value: Option<String>) -> Option<String> {
    match value {
        Some(v) if v.is_empty() || v == "-" => None,
        other => other,
    }
}

/// Listing dates come as compact integers, e.g. `19991110`
fn parse_compact_date(value: i64) -> Option<NaiveDate> {
    if value <= 0 {
        return None;
    }
    let year = (value / 10_000) as i32;
    let month = ((value / 100) % 100) as u32;
    let day = (value % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// One kline row is a comma-joined string:
/// date,open,close,high,low,volume,amount,amplitude,pct_change,change,turnover
fn parse_kline(code: &str, line: &str) -> Result<PriceBar> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 7 {
        return Err(AppError::Feed(format!(
            "kline row for {} has {} fields: {}",
            code,
            fields.len(),
            line
        )));
    }

    let date = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d")?;

    Ok(PriceBar {
        code: code.to_string(),
        date,
        open: req_f64(&fields, 1),
        close: req_f64(&fields, 2),
        high: req_f64(&fields, 3),
        low: req_f64(&fields, 4),
        volume: req_f64(&fields, 5),
        amount: opt_f64(&fields, 6),
        pct_change: opt_f64(&fields, 8),
        turnover_rate: opt_f64(&fields, 10),
    })
}

/// Required field: a missing or malformed value defaults to 0.0
fn req_f64(fields: &[&str], index: usize) -> f64 {
    opt_f64(fields, index).unwrap_or(0.0)
}

fn opt_f64(fields: &[&str], index: usize) -> Option<f64> {
    fields.get(index).and_then(|v| v.parse::<f64>().ok())
}
