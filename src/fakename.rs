use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;

const MALE_FIRST_NAMES: &[&str] = &[
    "James", "John", "Robert", "Michael", "William", "David", "Richard", "Joseph", "Thomas", "Charles",
    "Christopher", "Daniel", "Matthew", "Anthony", "Mark", "Donald", "Steven", "Paul", "Andrew", "Joshua",
    "Kenneth", "Kevin", "Brian", "George", "Timothy", "Ronald", "Edward", "Jason", "Jeffrey", "Ryan",
    "Jacob", "Gary", "Nicholas", "Eric", "Jonathan", "Stephen", "Larry", "Justin", "Scott", "Brandon",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan", "Jessica", "Sarah", "Karen",
    "Lisa", "Nancy", "Betty", "Margaret", "Sandra", "Ashley", "Kimberly", "Emily", "Donna", "Michelle",
    "Carol", "Amanda", "Dorothy", "Melissa", "Deborah", "Stephanie", "Rebecca", "Sharon", "Laura", "Cynthia",
    "Kathleen", "Amy", "Angela", "Shirley", "Anna", "Brenda", "Pamela", "Emma", "Nicole", "Helen",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez", "Martinez",
    "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson", "Martin",
    "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez", "Clark", "Ramirez", "Lewis", "Robinson",
    "Walker", "Young", "Allen", "King", "Wright", "Scott", "Torres", "Nguyen", "Hill", "Flores",
    "Van Dyke", "Mc Allister",
];

const PASSWORD_LEN: usize = 12;
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()_+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn emoji(self) -> &'static str {
        match self {
            Gender::Male => "👨",
            Gender::Female => "👩",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
}

impl Identity {
    pub fn generate<R: Rng + ?Sized>(gender: Gender, rng: &mut R, today: NaiveDate) -> Self {
        let first_names = match gender {
            Gender::Male => MALE_FIRST_NAMES,
            Gender::Female => FEMALE_FIRST_NAMES,
        };
        let first_name = pick(first_names, rng).to_owned();
        let last_name = pick(LAST_NAMES, rng).to_owned();
        let username = format!(
            "{}{}{}",
            squash(&first_name),
            squash(&last_name),
            rng.gen_range(10..=99)
        );
        let password = format!("{}{:02}", password(rng), today.day());
        Self { first_name, last_name, username, password }
    }
}

fn pick<'a, R: Rng + ?Sized>(items: &[&'a str], rng: &mut R) -> &'a str {
    items.choose(rng).copied().unwrap_or("Alex")
}

fn squash(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// Random password with at least one character of every class.
fn password<R: Rng + ?Sized>(rng: &mut R) -> String {
    let classes = [UPPER, LOWER, DIGITS, SPECIAL];
    let all: Vec<u8> = classes.concat();
    let mut chars: Vec<u8> = classes.iter().filter_map(|class| class.choose(rng).copied()).collect();
    while chars.len() < PASSWORD_LEN {
        if let Some(c) = all.choose(rng) {
            chars.push(*c);
        }
    }
    chars.shuffle(rng);
    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn identity_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let id = Identity::generate(Gender::Female, &mut rng, date(3));
            assert!(FEMALE_FIRST_NAMES.contains(&id.first_name.as_str()));
            assert!(LAST_NAMES.contains(&id.last_name.as_str()));

            let prefix = format!("{}{}", squash(&id.first_name), squash(&id.last_name));
            let suffix: u32 = id.username.strip_prefix(&prefix).unwrap().parse().unwrap();
            assert!((10..=99).contains(&suffix));
            assert!(!id.username.contains(' '));

            assert_eq!(id.password.len(), PASSWORD_LEN + 2);
            assert!(id.password.ends_with("03"));
            let body = &id.password[..PASSWORD_LEN];
            assert!(body.chars().any(|c| c.is_ascii_uppercase()));
            assert!(body.chars().any(|c| c.is_ascii_lowercase()));
            assert!(body.chars().any(|c| c.is_ascii_digit()));
            assert!(body.bytes().any(|c| SPECIAL.contains(&c)));
        }
    }

    #[test]
    fn male_names_come_from_the_male_list() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = Identity::generate(Gender::Male, &mut rng, date(21));
        assert!(MALE_FIRST_NAMES.contains(&id.first_name.as_str()));
        assert!(id.password.ends_with("21"));
    }

    #[test]
    fn squash_drops_spaces() {
        assert_eq!(squash("Van Dyke"), "vandyke");
    }
}
