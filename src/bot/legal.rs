pub const NAME: &str = "LegalEase, a legal information assistant";

pub const DESCRIPTION: &str =
    "I help people understand everyday legal questions in plain language: tenancy, \
employment, contracts, family matters, consumer protection and similar topics. \
I give general legal information, not legal advice, and I recommend consulting a \
licensed attorney in the user's jurisdiction for decisions about a specific case.";

pub const SCOPE: &str = "law, legal rights and legal procedures";

pub const REFUSAL: &str =
    "I'm sorry, but I can only help with legal questions. Please ask me something related to law or your legal rights.";

pub const GREETING: &str =
    "Hello! I'm your legal assistant. Ask me about tenancy, contracts, employment, family law or your rights, and I'll explain it in plain language.";

pub const KEYWORDS: &[&str] = &[
    "law",
    "legal",
    "lawyer",
    "attorney",
    "court",
    "judge",
    "jury",
    "lawsuit",
    "sue",
    "litigation",
    "contract",
    "agreement",
    "rights",
    "tenant",
    "landlord",
    "lease",
    "eviction",
    "divorce",
    "custody",
    "alimony",
    "child support",
    "inheritance",
    "estate",
    "testament",
    "probate",
    "trust",
    "property",
    "copyright",
    "trademark",
    "patent",
    "intellectual property",
    "liability",
    "negligence",
    "damages",
    "compensation",
    "settlement",
    "criminal",
    "arrest",
    "bail",
    "police",
    "crime",
    "felony",
    "misdemeanor",
    "defamation",
    "libel",
    "slander",
    "employment",
    "discrimination",
    "harassment",
    "wrongful termination",
    "immigration",
    "visa",
    "citizenship",
    "consumer",
    "warranty",
    "refund",
    "privacy",
    "gdpr",
    "statute",
    "regulation",
    "compliance",
    "notary",
    "affidavit",
    "subpoena",
    "appeal",
    "plaintiff",
    "defendant",
];
