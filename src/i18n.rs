use crate::db::models::Language;

/// User-facing texts the dispatcher writes into a conversation.
#[derive(Debug, Clone, Copy)]
pub struct Strings {
    pub no_answer: &'static str,
    pub server_error: &'static str,
    pub no_connection: &'static str,
    pub timeout: &'static str,
    pub context_header: &'static str,
    pub question_header: &'static str,
    pub from_file: &'static str,
}

const RU: Strings = Strings {
    no_answer: "Нет ответа от ассистента.",
    server_error: "Ошибка сервера. Попробуйте позже.",
    no_connection: "Нет соединения с сервером. Проверьте интернет или попробуйте позже.",
    timeout: "Превышено время ожидания ответа. Попробуйте позже.",
    context_header: "Контекст из загруженных файлов:",
    question_header: "Вопрос пользователя:",
    from_file: "Из файла",
};

const KK: Strings = Strings {
    no_answer: "Ассистенттен жауап жоқ.",
    server_error: "Сервер қатесі. Кейінірек қайталап көріңіз.",
    no_connection: "Сервермен байланыс жоқ. Интернетті тексеріңіз немесе кейінірек қайталап көріңіз.",
    timeout: "Жауап күту уақыты асып кетті. Кейінірек қайталап көріңіз.",
    context_header: "Жүктелген файлдардан алынған контекст:",
    question_header: "Пайдаланушы сұрағы:",
    from_file: "Файлдан",
};

const EN: Strings = Strings {
    no_answer: "No answer from the assistant.",
    server_error: "Server error. Please try again later.",
    no_connection: "No connection to the server. Check your internet connection or try again later.",
    timeout: "The response took too long. Please try again later.",
    context_header: "Context from uploaded files:",
    question_header: "User question:",
    from_file: "From file",
};

pub fn strings(language: Language) -> &'static Strings {
    match language {
        Language::Ru => &RU,
        Language::Kk => &KK,
        Language::En => &EN,
    }
}

/// Wrap a question with knowledge context; an empty context leaves it as is.
pub fn with_context(language: Language, context: &str, question: &str) -> String {
    if context.trim().is_empty() {
        return question.to_string();
    }
    let s = strings(language);
    format!(
        "{}\n{}\n\n{} {}",
        s.context_header, context, s.question_header, question
    )
}
