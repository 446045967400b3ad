use crate::{
    error::Error,
    pose::{Joint, NUM_JOINTS},
};
use serde::Deserialize;
use std::{borrow::Cow, collections::BTreeMap, fmt, fs, path::Path};
use tracing::info;

/// The poses the external classifier can recognize.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Asana {
    HalfMoon,
    Butterfly,
    DownwardDog,
    Dancer,
    Triangle,
    Goddess,
    Warrior,
    Tree,
}

pub(crate) const NUM_ASANAS: usize = 8;

impl Asana {
    pub(crate) const ALL: [Asana; NUM_ASANAS] = [
        Asana::HalfMoon,
        Asana::Butterfly,
        Asana::DownwardDog,
        Asana::Dancer,
        Asana::Triangle,
        Asana::Goddess,
        Asana::Warrior,
        Asana::Tree,
    ];

    #[inline]
    pub(crate) fn idx(self) -> usize {
        self as usize
    }

    /// The name shown to the user and used as the profile key.
    pub(crate) fn display_name(self) -> &'static str {
        constants::NAMES[self.idx()].1
    }

    /// The label the classification model was trained with.
    pub(crate) fn model_label(self) -> &'static str {
        constants::NAMES[self.idx()].0
    }

    /// Resolve a classifier label, trying display names before model labels.
    pub(crate) fn resolve(label: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|asana| asana.display_name() == label)
            .or_else(|| {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|asana| asana.model_label() == label)
            })
    }
}

impl fmt::Display for Asana {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl serde::Serialize for Asana {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.display_name())
    }
}

/// Ideal angles for one pose, in canonical joint order, and the allowed deviation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
pub(crate) struct PoseProfile {
    pub(crate) angles: [u16; NUM_JOINTS],
    pub(crate) tolerance: u16,
}

impl PoseProfile {
    pub(crate) fn ideal(&self, joint: Joint) -> u16 {
        self.angles[joint.idx()]
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    profile: PoseProfile,
    guidance: Cow<'static, str>,
}

/// The reference table consulted by feedback generation. Built once, then read-only.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Profiles {
    entries: Vec<Entry>,
}

/// One pose's overrides in a profile file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileOverride {
    angles: Option<[u16; NUM_JOINTS]>,
    tolerance: Option<u16>,
    guidance: Option<String>,
}

impl Profiles {
    pub(crate) fn builtin() -> Self {
        let entries = Asana::ALL
            .iter()
            .map(|&asana| Entry {
                profile: constants::PROFILES[asana.idx()].1,
                guidance: Cow::Borrowed(constants::GUIDANCE[asana.idx()].1),
            })
            .collect();
        Self { entries }
    }

    /// The built-in table with the overrides in the TOML file at `path` merged over it.
    pub(crate) fn load<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| Error::ReadProfiles(e, path.to_path_buf()))?;
        let overrides: BTreeMap<String, ProfileOverride> =
            toml::from_str(&content).map_err(|e| Error::ParseProfiles(e, path.to_path_buf()))?;
        let profiles = Self::builtin().with_overrides(overrides)?;
        info!(message = "loaded pose profiles", path = %path.display());
        Ok(profiles)
    }

    fn with_overrides(mut self, overrides: BTreeMap<String, ProfileOverride>) -> Result<Self, Error> {
        for (name, o) in overrides {
            let asana =
                Asana::resolve(&name).ok_or_else(|| Error::UnknownPoseInProfiles(name.clone()))?;
            let entry = &mut self.entries[asana.idx()];
            if let Some(angles) = o.angles {
                if let Some((joint, &angle)) = Joint::ALL
                    .iter()
                    .zip(angles.iter())
                    .find(|&(_, &angle)| angle > 180)
                {
                    return Err(Error::ProfileAngleOutOfRange {
                        pose: name,
                        joint: *joint,
                        angle,
                    });
                }
                entry.profile.angles = angles;
            }
            if let Some(tolerance) = o.tolerance {
                entry.profile.tolerance = tolerance;
            }
            if let Some(guidance) = o.guidance {
                entry.guidance = Cow::Owned(guidance);
            }
        }
        Ok(self)
    }

    pub(crate) fn profile(&self, asana: Asana) -> &PoseProfile {
        &self.entries[asana.idx()].profile
    }

    pub(crate) fn guidance(&self, asana: Asana) -> &str {
        &self.entries[asana.idx()].guidance
    }

    pub(crate) fn tips(&self, asana: Asana) -> &'static [&'static str] {
        &constants::TIPS[asana.idx()].1
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Asana, &PoseProfile)> + '_ {
        Asana::ALL
            .iter()
            .zip(self.entries.iter())
            .map(|(&asana, entry)| (asana, &entry.profile))
    }
}

impl Default for Profiles {
    fn default() -> Self {
        Self::builtin()
    }
}

pub(crate) mod constants {
    use super::{
        Asana::{self, *},
        PoseProfile, NUM_ASANAS,
    };

    /// Shown when no pose is recognized.
    pub(crate) const GENERIC_GUIDANCE: &str =
        "Focus on steady breathing and maintain the pose alignment";

    /// Shown when every joint is within tolerance.
    pub(crate) const AFFIRMATION: &str = "Perfect form! Maintain this pose";

    /// Classifier label the backend returns while it has no usable skeleton.
    pub(crate) const WAITING_LABEL: &str = "Waiting...";

    /// Classifier label the backend returns when it failed internally.
    pub(crate) const ERROR_LABEL: &str = "Error";

    /// `(model label, display name)`
    pub(crate) const NAMES: [(&str, &str); NUM_ASANAS] = [
        ("ArdhaChandrasana", "Half Moon Pose"),
        ("BaddhaKonasana", "Butterfly Pose"),
        ("Downward_dog", "Downward Dog"),
        ("Natarajasana", "Dancer Pose"),
        ("Triangle", "Triangle Pose"),
        ("UtkataKonasana", "Goddess Pose"),
        ("Veerabhadrasana", "Warrior Pose"),
        ("Vrukshasana", "Tree Pose"),
    ];

    pub(crate) const PROFILES: [(Asana, PoseProfile); NUM_ASANAS] = [
        (
            HalfMoon,
            PoseProfile {
                angles: [170, 160, 175, 170, 165, 175, 170, 165],
                tolerance: 15,
            },
        ),
        (
            Butterfly,
            PoseProfile {
                angles: [120, 125, 110, 115, 100, 105, 90, 95],
                tolerance: 20,
            },
        ),
        (
            DownwardDog,
            PoseProfile {
                angles: [145, 150, 155, 160, 170, 165, 175, 170],
                tolerance: 15,
            },
        ),
        (
            Dancer,
            PoseProfile {
                angles: [165, 170, 160, 155, 150, 145, 140, 135],
                tolerance: 15,
            },
        ),
        (
            Triangle,
            PoseProfile {
                angles: [155, 160, 150, 145, 140, 135, 130, 125],
                tolerance: 15,
            },
        ),
        (
            Goddess,
            PoseProfile {
                angles: [120, 125, 130, 135, 140, 145, 150, 155],
                tolerance: 20,
            },
        ),
        (
            Warrior,
            PoseProfile {
                angles: [145, 150, 155, 160, 165, 170, 175, 170],
                tolerance: 15,
            },
        ),
        (
            Tree,
            PoseProfile {
                angles: [170, 165, 160, 155, 150, 145, 140, 135],
                tolerance: 10,
            },
        ),
    ];

    pub(crate) const GUIDANCE: [(Asana, &str); NUM_ASANAS] = [
        (HalfMoon, "Keep your standing leg straight and extend through your lifted heel"),
        (Butterfly, "Gently bounce your knees toward the floor while keeping your spine straight"),
        (DownwardDog, "Press firmly through your palms and rotate your upper arms outward"),
        (Dancer, "Focus on a fixed point to maintain balance while lifting your chest"),
        (Triangle, "Keep both sides of your waist equally long and extend through your top arm"),
        (Goddess, "Sink your hips low while keeping your knees aligned over your ankles"),
        (Warrior, "Keep your front knee at 90° and your back leg strong and straight"),
        (Tree, "Press your foot firmly into your inner thigh and bring palms together at heart center"),
    ];

    pub(crate) static TIPS: [(Asana, [&str; 2]); NUM_ASANAS] = [
        (HalfMoon, ["Keep your standing leg straight", "Extend through your lifted heel"]),
        (Butterfly, ["Gently bounce your knees toward the floor", "Keep your spine straight"]),
        (DownwardDog, ["Press firmly through your palms", "Rotate your upper arms outward"]),
        (Dancer, ["Focus on a fixed point", "Lift your chest and extend your leg"]),
        (Triangle, ["Keep both sides of your waist equally long", "Extend through your top arm"]),
        (Goddess, ["Sink your hips low", "Keep knees aligned over ankles"]),
        (Warrior, ["Keep your front knee at 90°", "Keep your back leg strong and straight"]),
        (Tree, ["Press your foot firmly into your inner thigh", "Bring palms together at heart center"]),
    ];
}
