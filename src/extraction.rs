use crate::sample::{AtomicSeries, BlankTable, ChannelMap, Parameters, Role, Sample};
use crate::Result;

/// Produces the blank corrected series for the ratio model from a sample's channels
///
/// Implementors may use the method constants in `parameters`, for example to correct for
/// mass bias. The engine forwards them untouched.
pub trait Extract: Sync {
    /// # Errors
    /// Implementations return a configuration error for unmapped roles or missing channels and
    /// an input shape error for inconsistent series.
    fn extract(
        &self,
        sample: &Sample,
        channels: &ChannelMap,
        blank: &BlankTable,
        parameters: &Parameters,
    ) -> Result<AtomicSeries>;
}

/// Subtracts the blank of each channel from every sweep
#[derive(Clone, Copy, Debug, Default)]
pub struct BlankCorrection;

impl Extract for BlankCorrection {
    fn extract(
        &self,
        sample: &Sample,
        channels: &ChannelMap,
        blank: &BlankTable,
        _parameters: &Parameters,
    ) -> Result<AtomicSeries> {
        let corrected = |role| -> Result<_> {
            let channel = channels.get(role)?;
            let background = blank.get(channel)?;
            Ok(sample.signal(channel)? - background)
        };
        AtomicSeries::new(
            corrected(Role::Parent)?,
            corrected(Role::Daughter)?,
            corrected(Role::Sister)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use super::{BlankCorrection, Extract};
    use crate::sample::{BlankTable, Channel, ChannelMap, Parameters, Role, Sample};
    use crate::ErrorKind;

    fn sample() -> Sample {
        Sample::new("91500")
            .with_channel(Channel::from("U238"), arr1(&[12., 13., 11.]))
            .with_channel(Channel::from("Pb206"), arr1(&[102., 104., 100.]))
            .with_channel(Channel::from("Pb207"), arr1(&[7., 7.2, 6.8]))
    }

    fn blank() -> BlankTable {
        BlankTable::default()
            .with(Channel::from("U238"), 2.)
            .with(Channel::from("Pb206"), 2.)
            .with(Channel::from("Pb207"), 2.)
    }

    #[test]
    fn blanks_are_subtracted_per_role() {
        let channels = ChannelMap::new(
            Channel::from("U238"),
            Channel::from("Pb206"),
            Channel::from("Pb207"),
        );
        let series = BlankCorrection
            .extract(&sample(), &channels, &blank(), &Parameters::default())
            .unwrap();

        assert_eq!(series.parent(), &arr1(&[10., 11., 9.]));
        assert_eq!(series.daughter(), &arr1(&[100., 102., 98.]));
        approx::assert_relative_eq!(series.sister()[1], 5.2, max_relative = 1e-12);
    }

    #[test]
    fn unmapped_roles_and_missing_blanks_are_configuration_errors() {
        let partial = ChannelMap::default()
            .with(Role::Parent, Channel::from("U238"))
            .with(Role::Daughter, Channel::from("Pb206"));
        let err = BlankCorrection
            .extract(&sample(), &partial, &blank(), &Parameters::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let channels = ChannelMap::new(
            Channel::from("U238"),
            Channel::from("Pb206"),
            Channel::from("Pb208"),
        );
        let err = BlankCorrection
            .extract(&sample(), &channels, &blank(), &Parameters::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
