use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a measurement channel, usually the isotope label such as `Pb206`
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Deserialize, Serialize)]
pub struct Channel(pub String);

impl From<&str> for Channel {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The logical role a channel plays in the ratio model
///
/// The two fitted ratios are `x = P / D` and `y = d / D`.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The parent isotope, P
    Parent,
    /// The daughter isotope, D, which is the denominator of both ratios
    Daughter,
    /// The second daughter-system isotope, d
    Sister,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parent => "parent (P)",
            Self::Daughter => "daughter (D)",
            Self::Sister => "sister (d)",
        };
        f.write_str(name)
    }
}

/// Assignment of exactly one channel to each [`Role`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelMap(HashMap<Role, Channel>);

impl ChannelMap {
    pub fn new(parent: Channel, daughter: Channel, sister: Channel) -> Self {
        Self(HashMap::from([
            (Role::Parent, parent),
            (Role::Daughter, daughter),
            (Role::Sister, sister),
        ]))
    }

    /// Assign `channel` to `role`, replacing any previous assignment
    #[must_use]
    pub fn with(mut self, role: Role, channel: Channel) -> Self {
        self.0.insert(role, channel);
        self
    }

    /// Look up the channel assigned to `role`
    ///
    /// # Errors
    /// Returns a configuration error if no channel is mapped to `role`.
    pub fn get(&self, role: Role) -> Result<&Channel> {
        self.0
            .get(&role)
            .ok_or_else(|| Error::configuration(format!("no channel mapped to the {role} role")))
    }
}

/// Background correction per channel, computed upstream from blank measurements
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct BlankTable(BTreeMap<Channel, f64>);

impl BlankTable {
    #[must_use]
    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.0.insert(channel, value);
        self
    }

    /// # Errors
    /// Returns a configuration error if the table holds no entry for `channel`.
    pub fn get(&self, channel: &Channel) -> Result<f64> {
        self.0
            .get(channel)
            .copied()
            .ok_or_else(|| Error::configuration(format!("no blank correction for channel {channel}")))
    }
}

/// Named method constants, such as decay constants, forwarded to the extraction step
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Parameters(BTreeMap<String, f64>);

impl Parameters {
    #[must_use]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_owned(), value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }
}

/// A single ablation: baseline corrected per-sweep intensities for each channel
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    name: String,
    signals: BTreeMap<Channel, Array1<f64>>,
}

impl Sample {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signals: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_channel(mut self, channel: Channel, signal: Array1<f64>) -> Self {
        self.signals.insert(channel, signal);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// # Errors
    /// Returns a configuration error if the sample was not measured on `channel`.
    pub fn signal(&self, channel: &Channel) -> Result<&Array1<f64>> {
        self.signals.get(channel).ok_or_else(|| {
            Error::configuration(format!(
                "sample `{}` has no channel {channel}",
                self.name
            ))
        })
    }
}

/// Blank corrected series for the three roles of the ratio model
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicSeries {
    pub(crate) parent: Array1<f64>,
    pub(crate) daughter: Array1<f64>,
    pub(crate) sister: Array1<f64>,
}

impl AtomicSeries {
    /// # Errors
    /// Returns an input shape error if the series are empty, differ in length or hold
    /// non-finite values.
    pub fn new(parent: Array1<f64>, daughter: Array1<f64>, sister: Array1<f64>) -> Result<Self> {
        check_shape([&parent, &daughter, &sister], "signal")?;
        Ok(Self {
            parent,
            daughter,
            sister,
        })
    }

    pub fn len(&self) -> usize {
        self.daughter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daughter.is_empty()
    }

    pub fn parent(&self) -> &Array1<f64> {
        &self.parent
    }

    pub fn daughter(&self) -> &Array1<f64> {
        &self.daughter
    }

    pub fn sister(&self) -> &Array1<f64> {
        &self.sister
    }

    /// The closed form starting point `(sum(P) / sum(D), sum(d) / sum(D))`
    pub fn ratio_of_sums(&self) -> (f64, f64) {
        let daughter = self.daughter.sum();
        (self.parent.sum() / daughter, self.sister.sum() / daughter)
    }
}

pub(crate) fn check_shape(series: [&Array1<f64>; 3], what: &str) -> Result<()> {
    let [parent, daughter, sister] = series;
    if daughter.is_empty() {
        return Err(Error::input_shape(format!("{what} series are empty")));
    }
    if parent.len() != daughter.len() || sister.len() != daughter.len() {
        return Err(Error::input_shape(format!(
            "{what} series differ in length: P has {}, D has {}, d has {}",
            parent.len(),
            daughter.len(),
            sister.len()
        )));
    }
    if series.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
        return Err(Error::input_shape(format!(
            "{what} series contain non-finite values"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use super::{AtomicSeries, Channel, ChannelMap, Role, Sample};
    use crate::ErrorKind;

    #[test]
    fn unmapped_roles_fail_loudly() {
        let channels = ChannelMap::default()
            .with(Role::Parent, Channel::from("U238"))
            .with(Role::Daughter, Channel::from("Pb206"));

        assert_eq!(channels.get(Role::Parent).unwrap().0, "U238");
        let err = channels.get(Role::Sister).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("sister"));
    }

    #[test]
    fn missing_sample_channel_is_a_configuration_error() {
        let sample = Sample::new("glass").with_channel(Channel::from("Pb206"), arr1(&[1., 2.]));
        let err = sample.signal(&Channel::from("Pb207")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn mismatched_series_are_rejected() {
        let err = AtomicSeries::new(arr1(&[1., 2.]), arr1(&[1., 2., 3.]), arr1(&[1., 2.]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let err = AtomicSeries::new(arr1(&[]), arr1(&[]), arr1(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let err = AtomicSeries::new(arr1(&[1., f64::NAN]), arr1(&[1., 2.]), arr1(&[1., 2.]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);
    }

    #[test]
    fn ratio_of_sums_puts_parent_first() {
        let series = AtomicSeries::new(
            arr1(&[10., 11., 9.]),
            arr1(&[100., 102., 98.]),
            arr1(&[5., 5.2, 4.8]),
        )
        .unwrap();
        let (x, y) = series.ratio_of_sums();
        approx::assert_relative_eq!(x, 0.1);
        approx::assert_relative_eq!(y, 0.05);
    }
}
