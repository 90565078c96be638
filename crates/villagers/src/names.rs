//! Orc names for NPCs in the Orc homeland.
//!
//! Female names read `<First> gra-<Surname>`, male names `<First> gro-<Surname>`.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::VarietyConfig;
use crate::world::Gender;

static FEMALE_FIRST: &[&str] = &[
    "Agrob", "Badbog", "Bashuk", "Bogdub", "Bugdurash", "Bula", "Bulak", "Bulfim", "Bum",
    "Burub", "Burzob", "Dura", "Durgat", "Durz", "Gashnakh", "Ghob", "Glasha", "Glob",
    "Gluronk", "Gonk", "Grat", "Grazob", "Gulfim", "Kharzug", "Lagakh", "Lambug", "Lazgar",
    "Mogak", "Morn", "Murob", "Murzush", "Nargol", "Orbul", "Ragash", "Rolfish", "Rulfim",
    "Shadbak", "Shagar", "Shagdub", "Sharn", "Sharog", "Shelur", "Sloomalah", "Uloth",
    "Ulumpha", "Urzoth", "Urzul", "Ushug", "Yazgash",
];

static MALE_FIRST: &[&str] = &[
    "Moghakh", "Atulg", "Azuk", "Bagamul", "Bakh", "Baronk", "Bashag", "Bazgulub", "Bogakh",
    "Bologra", "Borug", "Both", "Bugdul", "Bugharz", "Bugrash", "Bugrol", "Bumbub", "Burul",
    "Dul", "Dular", "Duluk", "Duma", "Dumbuk", "Dumburz", "Dur", "Durbul", "Durgash", "Durz",
    "Durzol", "Durzub", "Durzum", "Garothmuk", "Garzonk", "Gashna", "Ghamborz", "Ghamonk",
    "Ghoragdush", "Ghorlorz", "Glush", "Grat", "Gruzgob", "Guarg", "Gurak", "Khadba", "Khagra",
    "Khargol", "Koffutto", "Largakh", "Lorbumol", "Lorzub", "Lugdum", "Lugrub", "Lurog", "Mash",
    "Matuk", "Mauhul", "Mazorn", "Mol", "Morbash", "Mug", "Mugdul", "Muk", "Murag", "Murkub",
    "Murzol", "Muzgonk", "Nag", "Nar", "Nash", "Ogrul", "Ogrumbu", "Olfin", "Olumba", "Orakh",
    "Rogdul", "Shakh", "Shamar", "Shamob", "Shargam", "Sharkub", "Shat", "Shazgob", "Shulong",
    "Shura", "Shurkul", "Shuzug", "Snaglak", "Snakha", "Snat", "Ugdumph", "Ughash", "Ulam",
    "Umug", "Uram", "Urim", "Urul", "Urzog", "Ushamph", "Ushat", "Yadba", "Yagak", "Yak", "Yam",
    "Yambagorn", "Yambul", "Yargol", "Yashnarz", "Yatur",
];

static SURNAMES: &[&str] = &[
    "Agadbu", "Aglakh", "Agum", "Atumph", "Azorku", "Badbu", "Bagrat", "Bagul", "Bamog", "Bar",
    "Bargamph", "Bashnag", "Bat", "Batul", "Boga", "Bogamakh", "Bogharz", "Bogla", "Boglar",
    "Bogrol", "Boguk", "Bol", "Bolak", "Borbog", "Borbul", "Bug", "Bugarn", "Bulag", "Bularz",
    "Bulfish", "Burbug", "Burish", "Burol", "Buzga", "Dugul", "Dul", "Dula", "Dulob", "Dumul",
    "Dumulg", "Durga", "Durog", "Durug", "Dush", "Gar", "Gashel", "Gat", "Ghash", "Ghasharzol",
    "Gholfim", "Gholob", "Ghorak", "Glorzuf", "Gluk", "Glurkub", "Gorzog", "Grambak", "Gulfim",
    "Gurakh", "Gurub", "Kashug", "Khagdum", "Kharbush", "Kharz", "Khash", "Khashnar", "Khatub",
    "Khazor", "Lag", "Lagdub", "Largum", "Lazgarn", "Loghash", "Logob", "Logrob", "Lorga",
    "Lumbuk", "Lumob", "Lurkul", "Lurn", "Luzgan", "Magar", "Magrish", "Mar", "Marob",
    "Mashnar", "Mogduk", "Moghakh", "Mughol", "Muk", "Mulakh", "Murgol", "Murug", "Murz",
    "Muzgob", "Muzgub", "Muzgur", "Ogar", "Ogdub", "Ogdum", "Olor", "Olurba", "Orbuma", "Rimph",
    "Rugob", "Rush", "Rushub", "Shadbuk", "Shagdub", "Shagdulg", "Shagrak", "Shagramph", "Shak",
    "Sham", "Shamub", "Sharbag", "Sharga", "Sharob", "Sharolg", "Shat", "Shatub", "Shazog",
    "Shug", "Shugarz", "Shugham", "Shula", "Shulor", "Shumba", "Shuzgub", "Skandar", "Snagarz",
    "Snagdu", "Ufthamph", "Uftharz", "Ugruma", "Ular", "Ulfimph", "Urgak", "Ushar", "Ushug",
    "Ushul", "Uzgurn", "Uzuk", "Yagarz", "Yak", "Yargul", "Yarzol",
];

fn surname_prefix(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => "gra-",
        Gender::Male => "gro-",
    }
}

/// A random Orc name for `gender`.
pub fn generate_name(gender: Gender, rng: &mut impl Rng) -> String {
    let firsts = match gender {
        Gender::Female => FEMALE_FIRST,
        Gender::Male => MALE_FIRST,
    };
    // Both tables are non-empty constants.
    let first = firsts.choose(rng).copied().unwrap_or_default();
    let surname = SURNAMES.choose(rng).copied().unwrap_or_default();
    format!("{} {}{}", first, surname_prefix(gender), surname)
}

/// An Orc name when `region` uses the Orc tables, otherwise `None` so the host keeps its own.
pub fn generate_name_for(
    region: u32,
    gender: Gender,
    config: &VarietyConfig,
    rng: &mut impl Rng,
) -> Option<String> {
    config
        .orc_name_regions
        .contains(&region)
        .then(|| generate_name(gender, rng))
}
