//! Research extras: news headlines, AI commentary and a moving-average forecast.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::adapters::fetch_json;
use crate::config::{AppConfig, ConfigError};
use crate::data_source::{BarsRequest, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::indicators::{moving_average_forecast, FORECAST_WINDOW};
use crate::routing::{RouteFailure, SourceRouter, SourceStrategy};
use crate::{AssetClass, Interval, ProviderId, Symbol};

const NEWS_URL: &str = "https://newsapi.org/v2/everything";
const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const NEWS_LIMIT: usize = 5;
const FORECAST_LOOKBACK_DAYS: u32 = 365;
const ANALYST_PROMPT: &str = "You are a financial analyst.";

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("price history unavailable: {}", .0.summary())]
    Route(RouteFailure),

    #[error("not enough closing prices for a forecast (have {have}, need {need})")]
    InsufficientHistory { have: usize, need: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub symbol: Symbol,
    pub last_close: f64,
    pub predicted_price: f64,
    pub observations: usize,
    pub source: ProviderId,
}

/// Client for the news and chat-completion services.
pub struct ResearchClient {
    http_client: Arc<dyn HttpClient>,
    config: AppConfig,
}

impl ResearchClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: AppConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// First five articles mentioning `company`.
    pub async fn latest_news(&self, company: &str) -> Result<Vec<NewsArticle>, ResearchError> {
        let key = self.config.news_key()?;
        let request = HttpRequest::get(format!(
            "{NEWS_URL}?q={}&apiKey={}",
            urlencoding::encode(company.trim()),
            urlencoding::encode(key.expose())
        ))
        .with_timeout_ms(self.config.timeout_ms);

        let response: NewsResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::Newsapi, request).await?;
        if response.status.as_deref() == Some("error") {
            return Err(SourceError::unavailable(format!(
                "newsapi: {}",
                response.message.unwrap_or_else(|| String::from("unknown error"))
            ))
            .into());
        }

        let articles = response
            .articles
            .into_iter()
            .filter_map(|article| {
                Some(NewsArticle {
                    title: article.title?,
                    url: article.url?,
                })
            })
            .take(NEWS_LIMIT)
            .collect::<Vec<_>>();
        debug!(company, articles = articles.len(), "news fetched");
        Ok(articles)
    }

    /// Free-text analysis of `company` from the chat-completion service.
    pub async fn insights(&self, company: &str) -> Result<String, ResearchError> {
        let key = self.config.openai_key()?;
        let prompt = format!(
            "Analyze the financial health, future prospects, and challenges for {}. \
             Consider its recent earnings, industry trends, and executive leadership.",
            company.trim()
        );
        let body = json!({
            "model": self.config.openai_model,
            "messages": [
                { "role": "system", "content": ANALYST_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let request = HttpRequest::post(CHAT_URL)
            .with_auth(&HttpAuth::BearerToken(key.expose().to_owned()))
            .with_json_body(body.to_string())
            .with_timeout_ms(self.config.timeout_ms);
        let response: ChatResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::Openai, request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SourceError::internal("chat completion returned no choices").into())
    }
}

/// Projects the next close as the latest five-day mean over a year of daily closes.
pub async fn forecast(
    router: &SourceRouter,
    symbol: Symbol,
    asset_class: AssetClass,
    strategy: SourceStrategy,
) -> Result<(Forecast, Vec<ProviderId>), ResearchError> {
    let request = BarsRequest::new(
        symbol.clone(),
        asset_class,
        Interval::OneDay,
        FORECAST_LOOKBACK_DAYS,
    )?;
    let routed = router
        .route_bars(&request, strategy)
        .await
        .map_err(ResearchError::Route)?;

    let prices = routed.data.close_prices().prices();
    let predicted_price =
        moving_average_forecast(&prices).ok_or(ResearchError::InsufficientHistory {
            have: prices.len(),
            need: FORECAST_WINDOW,
        })?;

    Ok((
        Forecast {
            symbol,
            last_close: prices.last().copied().unwrap_or(predicted_price),
            predicted_price,
            observations: prices.len(),
            source: routed.selected_source,
        },
        routed.source_chain,
    ))
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
