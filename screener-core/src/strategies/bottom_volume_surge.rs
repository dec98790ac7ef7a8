//! Bottom volume surge — a volume spike lifting price off a tight
//! consolidation base.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, mean, signal_from_score, tail, tier_at_least, ResultHeader, Strategy,
    StrategyResult, TIERS_80_60_40_20,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{pct_change_at, Bar, SecuritySeries, StrategySignal};
use crate::error::ScreenError;
use crate::indicators::{highest_high, lowest_low, prior_volume_mean};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BottomVolumeSurgeConfig {
    pub analysis_period: usize,
    pub volume_ma_period: usize,
    /// Multiple of the prior volume average that counts as a surge.
    pub volume_surge_threshold: f64,
    /// Rise (%) from the base low that counts as a breakout.
    pub price_rise_threshold: f64,
    pub bottom_period: usize,
    /// Maximum high-low spread (%) of the base.
    pub bottom_price_range: f64,
    pub min_daily_rise: f64,
}

impl Default for BottomVolumeSurgeConfig {
    fn default() -> Self {
        Self {
            analysis_period: 30,
            volume_ma_period: 5,
            volume_surge_threshold: 3.0,
            price_rise_threshold: 2.0,
            bottom_period: 10,
            bottom_price_range: 10.0,
            min_daily_rise: 3.0,
        }
    }
}

impl BottomVolumeSurgeConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn conservative() -> Self {
        Self {
            analysis_period: 30,
            volume_ma_period: 10,
            volume_surge_threshold: 2.0,
            price_rise_threshold: 3.0,
            bottom_period: 15,
            bottom_price_range: 3.0,
            min_daily_rise: 1.0,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            analysis_period: 15,
            volume_ma_period: 3,
            volume_surge_threshold: 1.2,
            price_rise_threshold: 1.0,
            bottom_period: 7,
            bottom_price_range: 8.0,
            min_daily_rise: 0.1,
        }
    }
}

impl ValidateConfig for BottomVolumeSurgeConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(
            self.analysis_period > 0 && self.volume_ma_period > 0 && self.bottom_period > 0,
            "bottom-volume-surge periods must be > 0",
        )?;
        ensure(
            self.bottom_period < self.analysis_period,
            "bottom_period must be shorter than analysis_period",
        )?;
        ensure(
            self.volume_surge_threshold > 0.0
                && self.price_rise_threshold > 0.0
                && self.bottom_price_range > 0.0
                && self.min_daily_rise > 0.0,
            "bottom-volume-surge thresholds must be > 0",
        )
    }
}

/// Consolidation base found in the bars before the latest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottomBase {
    pub is_bottom: bool,
    pub low: f64,
    pub high: f64,
    pub low_date: NaiveDate,
    pub range_pct: f64,
}

/// Judge whether `window` is a base: a tight range, a last close no more
/// than 1% under the low, and either an early low or no slide in the
/// second half.
pub fn detect_bottom(window: &[Bar], max_range_pct: f64) -> Option<BottomBase> {
    let (low_idx, low_bar) = window
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.low.total_cmp(&b.1.low))?;
    let low = low_bar.low;
    let high = highest_high(window)?;
    let range_pct = if low > 0.0 {
        (high - low) / low * 100.0
    } else {
        f64::INFINITY
    };

    let tight = range_pct <= max_range_pct;
    let stable = window.last().map_or(false, |b| b.close >= low * 0.99);
    let early_low = low_idx < window.len() * 4 / 5;
    let mid = window.len() / 2;
    let no_slide = mid == 0
        || mean(window[mid..].iter().map(|b| b.close))
            >= mean(window[..mid].iter().map(|b| b.close)) * 0.95;

    Some(BottomBase {
        is_bottom: tight && stable && (early_low || no_slide),
        low,
        high,
        low_date: low_bar.date,
        range_pct,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottomVolumeSurgeResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub daily_change_pct: f64,
    pub base: Option<BottomBase>,
    pub volume_ma: f64,
    pub volume_surge_ratio: f64,
    /// Rise (%) of the close above the base low.
    pub price_rise_pct: f64,
    /// Close position within the analysis window's range, 0..=1.
    pub price_position: f64,
}

#[derive(Debug, Clone)]
pub struct BottomVolumeSurgeStrategy {
    config: BottomVolumeSurgeConfig,
}

impl BottomVolumeSurgeStrategy {
    pub fn new(config: BottomVolumeSurgeConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BottomVolumeSurgeConfig {
        &self.config
    }
}

impl Strategy for BottomVolumeSurgeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BottomVolumeSurge
    }

    fn required_bars(&self) -> usize {
        let c = &self.config;
        c.analysis_period
            .max(c.bottom_period + 1)
            .max(c.volume_ma_period + 1)
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let bars = &series.bars;
        let last = bars.len() - 1;
        let daily_change_pct = pct_change_at(bars, last);

        let rejected = |reason: String| {
            StrategyResult::BottomVolumeSurge(BottomVolumeSurgeResult {
                header: ResultHeader::new(series, latest, StrategySignal::Sell, 0.0, 5, reason),
                daily_change_pct,
                base: None,
                volume_ma: 0.0,
                volume_surge_ratio: 0.0,
                price_rise_pct: 0.0,
                price_position: 0.0,
            })
        };
        if latest.is_bearish() {
            return Ok(rejected(format!(
                "bearish candle (open {:.2}, close {:.2})",
                latest.open, latest.close
            )));
        }
        if daily_change_pct < c.min_daily_rise {
            return Ok(rejected(format!(
                "daily change {daily_change_pct:.2}% below the required {:.2}%",
                c.min_daily_rise
            )));
        }

        let base_window = &bars[last - c.bottom_period..last];
        let base = detect_bottom(base_window, c.bottom_price_range);
        let is_bottom = base.as_ref().map_or(false, |b| b.is_bottom);
        let base_low = base.as_ref().map_or(latest.close, |b| b.low);

        let volume_ma = prior_volume_mean(bars, last, c.volume_ma_period)?;
        let volume_surge_ratio = if volume_ma > 0.0 {
            latest.volume / volume_ma
        } else {
            0.0
        };
        let price_rise_pct = latest.pct_change_from(base_low);

        let surge = c.volume_surge_threshold;
        let rise = c.price_rise_threshold;
        let score = if is_bottom { 40.0 } else { 0.0 }
            + tier_at_least(
                volume_surge_ratio,
                &[(surge * 2.0, 30.0), (surge * 1.5, 20.0), (surge, 15.0)],
            )
            + tier_at_least(
                price_rise_pct,
                &[(rise * 2.0, 30.0), (rise * 1.5, 20.0), (rise, 15.0)],
            );

        let window = tail(bars, c.analysis_period);
        let price_position = match (highest_high(window), lowest_low(window)) {
            (Some(hi), Some(lo)) if hi > lo => (latest.close - lo) / (hi - lo),
            _ => 0.5,
        };
        let risk = if price_position < 0.3 {
            2
        } else if price_position > 0.7 {
            4
        } else {
            3
        };

        debug!(
            code = %series.code,
            is_bottom,
            volume_surge_ratio,
            price_rise_pct,
            score,
            "bottom volume surge evaluated"
        );

        let description = format!(
            "{}; volume x{volume_surge_ratio:.2}, {price_rise_pct:.2}% above base low {base_low:.2}",
            if is_bottom { "consolidation base" } else { "no base" }
        );
        Ok(StrategyResult::BottomVolumeSurge(BottomVolumeSurgeResult {
            header: ResultHeader::new(
                series,
                latest,
                signal_from_score(score, &TIERS_80_60_40_20),
                score,
                risk,
                description,
            ),
            daily_change_pct,
            base,
            volume_ma,
            volume_surge_ratio,
            price_rise_pct,
            price_position,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn analyze(bars: Vec<Bar>) -> BottomVolumeSurgeResult {
        let strategy = BottomVolumeSurgeStrategy::new(BottomVolumeSurgeConfig::default()).unwrap();
        match strategy.analyze(&SecuritySeries::new("002001.SZ", bars)).unwrap() {
            StrategyResult::BottomVolumeSurge(r) => r,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    /// 30 bars: a slide into a flat base at 10, then a 10% jump on 7x volume.
    fn surge_off_base() -> Vec<Bar> {
        let mut closes: Vec<f64> = (0..19).map(|i| 14.0 - i as f64 * 0.2).collect();
        closes.extend(std::iter::repeat(10.0).take(10));
        closes.push(11.0);
        let mut bars = make_bars(&closes);
        // tighten the base so its range is 1%
        for b in &mut bars[19..29] {
            b.high = 10.05;
            b.low = 9.95;
        }
        let last = bars.len() - 1;
        bars[last].volume = 7000.0;
        bars
    }

    #[test]
    fn surge_off_a_base_is_strong_buy() {
        let r = analyze(surge_off_base());
        assert!(r.base.as_ref().unwrap().is_bottom);
        assert!((r.volume_surge_ratio - 7.0).abs() < 1e-9);
        // 11 / 9.95 is about 10.6% off the low
        assert!(r.price_rise_pct > 4.0);
        assert_eq!(r.header.signal_strength, 100);
        assert_eq!(r.header.strategy_signal, StrategySignal::StrongBuy);
    }

    #[test]
    fn bearish_latest_bar_is_rejected() {
        let mut bars = surge_off_base();
        let last = bars.len() - 1;
        bars[last].open = 11.5;
        let r = analyze(bars);
        assert_eq!(r.header.strategy_signal, StrategySignal::Sell);
        assert_eq!(r.header.signal_strength, 0);
        assert_eq!(r.header.risk_level, 5);
    }

    #[test]
    fn small_rise_is_rejected() {
        let mut bars = surge_off_base();
        let last = bars.len() - 1;
        bars[last].close = 10.1;
        bars[last].high = 10.2;
        let r = analyze(bars);
        assert_eq!(r.header.signal_strength, 0);
        assert!(r.base.is_none());
    }

    #[test]
    fn wide_window_is_not_a_base() {
        let bars = make_bars(&[10.0, 12.0, 9.0, 13.0, 10.0]);
        let base = detect_bottom(&bars, 10.0).unwrap();
        assert!(!base.is_bottom);
        assert!(detect_bottom(&[], 10.0).is_none());
    }

    #[test]
    fn validation_requires_base_inside_window() {
        let config = BottomVolumeSurgeConfig {
            bottom_period: 30,
            ..BottomVolumeSurgeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
