pub const NAME: &str = "ChallengeBuddy, a daily challenge coach";

pub const DESCRIPTION: &str =
    "I suggest one small, achievable challenge each day, help people build healthy habits \
and keep them motivated. Challenges cover fitness, mindfulness, learning, creativity, \
productivity and kindness, and can be adapted to the user's time and energy.";

pub const SCOPE: &str = "daily challenges, habits, motivation and personal growth";

pub const REFUSAL: &str =
    "I'm sorry, but I can only help with daily challenges and personal growth. Ask me for today's challenge or for help with a habit!";

pub const GREETING: &str =
    "Hi! I'm your daily challenge coach. Want a challenge for today, or help sticking with a habit?";

pub const KEYWORDS: &[&str] = &[
    "challenge",
    "daily",
    "today",
    "habit",
    "routine",
    "goal",
    "motivation",
    "motivate",
    "streak",
    "progress",
    "accountability",
    "fitness",
    "workout",
    "exercise",
    "steps",
    "walk",
    "run",
    "yoga",
    "stretch",
    "push-up",
    "pushup",
    "squat",
    "plank",
    "meditation",
    "meditate",
    "mindfulness",
    "breathing",
    "journal",
    "gratitude",
    "reading",
    "read",
    "learn",
    "skill",
    "productivity",
    "focus",
    "procrastination",
    "discipline",
    "sleep",
    "water",
    "hydration",
    "diet",
    "nutrition",
    "healthy",
    "wellness",
    "self-improvement",
    "personal growth",
    "creativity",
    "writing",
    "drawing",
    "declutter",
    "digital detox",
    "screen time",
    "kindness",
    "social",
    "complete",
    "task",
];
